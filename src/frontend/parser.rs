use std::str::FromStr;

use crate::{
    frontend::{
        SourceFile,
        error::{Location, ParseError},
        lexer::{Lexer, Token, TokenKind},
    },
    middle::l2::{self, Label, Opcode, OperandKind},
};

pub struct Parser<'source> {
    lexer: Lexer<'source>,
    program: l2::Program,
    saw_main: bool,
    section: Option<Section>,
}

#[derive(Debug, Clone)]
enum Section {
    Main,
    Closure(Label),
}

impl<'source> Parser<'source> {
    fn new(source: &'source SourceFile) -> Self {
        Self {
            lexer: Lexer::new(source),
            program: l2::Program::default(),
            saw_main: false,
            section: None,
        }
    }

    pub fn parse_program(source: &'source SourceFile) -> Result<l2::Program, ParseError> {
        let mut parser = Self::new(source);

        while let Some(line) = parser.lexer.next_line()? {
            if line.last().is_some_and(|t| t.kind == TokenKind::Colon) {
                parser.parse_section_header(&line)?;
            } else {
                let instruction = parser.parse_instruction(&line)?;
                parser.current_body(line[0].location)?.push(instruction);
            }
        }

        if !parser.saw_main {
            return Err(ParseError::MissingMain);
        }

        tracing::debug!(
            origin = %source.origin,
            closures = parser.program.closures.len(),
            instructions = parser.program.instruction_count(),
            "read L2 program"
        );

        Ok(parser.program)
    }

    fn text(&self, token: &Token) -> &'source str {
        self.lexer.source().value_of_span(token.span)
    }

    fn current_body(
        &mut self,
        location: Location,
    ) -> Result<&mut Vec<l2::Instruction>, ParseError> {
        match &self.section {
            Some(Section::Main) => Ok(&mut self.program.main),
            Some(Section::Closure(name)) => {
                Ok(self.program.closures.entry(name.clone()).or_default())
            }
            None => Err(ParseError::InstructionOutsideSection { location }),
        }
    }

    fn parse_section_header(&mut self, line: &[Token]) -> Result<(), ParseError> {
        let location = line[0].location;
        let words = line[..line.len() - 1]
            .iter()
            .map(|token| (token.kind, self.text(token)))
            .collect::<Vec<_>>();

        let section = match words.as_slice() {
            [(TokenKind::Identifier, "main")] => {
                if self.saw_main {
                    return Err(ParseError::DuplicateSection {
                        name: Label::from("main"),
                        location,
                    });
                }

                self.saw_main = true;
                Section::Main
            }
            [(TokenKind::Identifier, "closure"), (TokenKind::Identifier, name)] => {
                let name = Label::from(*name);

                if self.program.closures.contains_key(&name) {
                    return Err(ParseError::DuplicateSection { name, location });
                }

                self.program.closures.insert(name.clone(), Vec::new());
                Section::Closure(name)
            }
            _ => return Err(ParseError::MalformedHeader { location }),
        };

        self.section = Some(section);

        Ok(())
    }

    fn parse_instruction(&self, line: &[Token]) -> Result<l2::Instruction, ParseError> {
        let tag = &line[0];
        let location = tag.location;

        let opcode = match tag.kind {
            TokenKind::Identifier => Opcode::from_str(self.text(tag)).map_err(|_| {
                ParseError::UnknownInstruction {
                    tag: self.text(tag).to_owned(),
                    location,
                }
            })?,
            _ => {
                return Err(ParseError::UnknownInstruction {
                    tag: self.text(tag).to_owned(),
                    location,
                });
            }
        };

        let expected = opcode.operand_kind();
        let operand = line.get(1);

        if let Some(extra) = line.get(if expected == OperandKind::None { 1 } else { 2 }) {
            return Err(ParseError::TrailingInput {
                found: self.text(extra).to_owned(),
                location: extra.location,
            });
        }

        let operand = match (expected, operand) {
            (OperandKind::None, _) => None,
            (_, Some(operand)) => Some(operand),
            (_, None) => {
                return Err(ParseError::MissingOperand {
                    opcode,
                    expected,
                    location,
                });
            }
        };

        let invalid = |operand: &Token| ParseError::InvalidOperand {
            opcode,
            expected,
            found: self.text(operand).to_owned(),
            location: operand.location,
        };

        let instruction = match (opcode, operand) {
            (Opcode::PushResult, _) => l2::Instruction::PushResult,
            (Opcode::Call, _) => l2::Instruction::Call,
            (_, None) => unreachable!("operand presence is checked above"),
            (Opcode::SetResult, Some(operand)) => {
                l2::Instruction::SetResult(self.integer(operand).ok_or_else(|| invalid(operand))?)
            }
            (Opcode::Variable, Some(operand)) => {
                l2::Instruction::Variable(self.depth(operand).ok_or_else(|| invalid(operand))?)
            }
            (Opcode::Set, Some(operand)) => {
                l2::Instruction::Set(self.depth(operand).ok_or_else(|| invalid(operand))?)
            }
            (Opcode::Closure, Some(operand)) => {
                l2::Instruction::Closure(self.label(operand).ok_or_else(|| invalid(operand))?)
            }
            (Opcode::Label, Some(operand)) => {
                l2::Instruction::Label(self.label(operand).ok_or_else(|| invalid(operand))?)
            }
            (Opcode::Jump, Some(operand)) => {
                l2::Instruction::Jump(self.label(operand).ok_or_else(|| invalid(operand))?)
            }
            (Opcode::JumpFalse, Some(operand)) => {
                l2::Instruction::JumpFalse(self.label(operand).ok_or_else(|| invalid(operand))?)
            }
        };

        Ok(instruction)
    }

    fn integer(&self, token: &Token) -> Option<i64> {
        (token.kind == TokenKind::IntegerLiteral)
            .then(|| self.text(token).parse().ok())
            .flatten()
    }

    fn depth(&self, token: &Token) -> Option<usize> {
        (token.kind == TokenKind::IntegerLiteral)
            .then(|| self.text(token).parse().ok())
            .flatten()
    }

    fn label(&self, token: &Token) -> Option<Label> {
        (token.kind == TokenKind::Identifier).then(|| Label::from(self.text(token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::l2::Instruction;

    fn parse(source: &str) -> Result<l2::Program, ParseError> {
        Parser::parse_program(&SourceFile::from_memory(source))
    }

    #[test]
    fn reads_main_and_closure_sections() {
        let program = parse(indoc::indoc! {"
            ; (lambda (x) x) applied to 7
            main:
                closure lambda_0
                push_result
                set_result 7
                call
            closure lambda_0:
                variable 0
        "})
        .unwrap();

        assert_eq!(
            program,
            l2::Program::new(vec![
                Instruction::Closure("lambda_0".into()),
                Instruction::PushResult,
                Instruction::SetResult(7),
                Instruction::Call,
            ])
            .with_closure("lambda_0", vec![Instruction::Variable(0)])
        );
    }

    #[test]
    fn every_tag_round_trips_through_its_operand() {
        let program = parse(indoc::indoc! {"
            main:
            label top
                set_result -9223372036854775808
                set 3
                jump_false done
                jump top
            label done
        "})
        .unwrap();

        assert_eq!(
            program.main,
            vec![
                Instruction::Label("top".into()),
                Instruction::SetResult(i64::MIN),
                Instruction::Set(3),
                Instruction::JumpFalse("done".into()),
                Instruction::Jump("top".into()),
                Instruction::Label("done".into()),
            ]
        );
    }

    #[test]
    fn empty_closure_body_is_kept() {
        let program = parse("main:\nclosure nothing:\n").unwrap();

        assert_eq!(program.closures.get(&Label::from("nothing")), Some(&vec![]));
    }

    #[test]
    fn unknown_tag_is_fatal() {
        assert_eq!(
            parse("main:\n    tail_call\n"),
            Err(ParseError::UnknownInstruction {
                tag: "tail_call".to_owned(),
                location: Location { line: 2, column: 5 },
            })
        );
    }

    #[test]
    fn missing_and_surplus_operands_are_rejected() {
        assert!(matches!(
            parse("main:\n  variable\n"),
            Err(ParseError::MissingOperand {
                opcode: Opcode::Variable,
                expected: OperandKind::Depth,
                ..
            })
        ));
        assert!(matches!(
            parse("main:\n  call lambda_0\n"),
            Err(ParseError::TrailingInput { .. })
        ));
        assert!(matches!(
            parse("main:\n  jump 12\n"),
            Err(ParseError::InvalidOperand { .. })
        ));
        assert!(matches!(
            parse("main:\n  variable -1\n"),
            Err(ParseError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn sections_must_be_well_formed_and_unique() {
        assert!(matches!(
            parse("  call\nmain:\n"),
            Err(ParseError::InstructionOutsideSection { .. })
        ));
        assert!(matches!(
            parse("main:\nclosure:\n"),
            Err(ParseError::MalformedHeader { .. })
        ));
        assert!(matches!(
            parse("main:\nclosure f:\nclosure f:\n"),
            Err(ParseError::DuplicateSection { .. })
        ));
        assert!(matches!(parse("main:\nmain:\n"), Err(ParseError::DuplicateSection { .. })));
        assert_eq!(parse("closure f:\n"), Err(ParseError::MissingMain));
    }
}
