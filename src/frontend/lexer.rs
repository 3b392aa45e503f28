use std::str::Chars;

use itertools::{PeekNth, peek_nth};

use crate::frontend::{
    SourceFile,
    error::{Location, ParseError},
};

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    line_number: usize,
    line_start: usize,
    chars: PeekNth<Chars<'source>>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,     // set_result
    IntegerLiteral, // -12
    Colon,          // :
    Newline,
}

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            line_number: 0,
            line_start: 0,
        }
    }

    pub fn source(&self) -> &'source SourceFile {
        self.source
    }

    fn location(&self) -> Location {
        Location {
            line: self.line_number + 1,
            column: self.position - self.line_start + 1,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();

        if c == '\n' {
            self.line_number += 1;
            self.line_start = self.position;
        }

        Some(c)
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.advance();
        }
    }

    fn read_while(&mut self, kind: TokenKind, predicate: impl Fn(char) -> bool) -> Token {
        let start_position = self.position;
        let location = self.location();

        while let Some(c) = self.chars.peek().copied() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        Token {
            kind,
            span: self.new_span(start_position),
            location,
        }
    }

    // Labels may carry the characters assemblers allow in symbol names
    fn read_word(&mut self) -> Token {
        self.read_while(TokenKind::Identifier, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
        })
    }

    fn read_number(&mut self) -> Token {
        let start_position = self.position;
        let location = self.location();

        if self.chars.peek() == Some(&'-') {
            self.advance();
        }

        let mut token = self.read_while(TokenKind::IntegerLiteral, |c| c.is_ascii_digit());
        token.span.start = start_position;
        token.location = location;
        token
    }

    fn read_single(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;
        let location = self.location();

        self.advance();

        Token {
            kind,
            span: self.new_span(start_position),
            location,
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span::new(start, self.position)
    }

    pub fn next(&mut self) -> Result<Option<Token>, ParseError> {
        while let Some(c) = self.chars.peek().copied() {
            let token = match c {
                '\n' => self.read_single(TokenKind::Newline),
                // Ignore whitespace
                c if c.is_whitespace() => {
                    self.advance();
                    continue;
                }
                // Ignore comments
                ';' | '#' => {
                    self.ignore_line();
                    continue;
                }

                n if n.is_ascii_digit() => self.read_number(),
                '-' if self.chars.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_number()
                }

                a if a.is_ascii_alphabetic() || a == '_' || a == '.' => self.read_word(),

                ':' => self.read_single(TokenKind::Colon),

                c => {
                    return Err(ParseError::UnexpectedCharacter {
                        character: c,
                        location: self.location(),
                    });
                }
            };

            return Ok(Some(token));
        }

        Ok(None)
    }

    /// Collects the tokens of the next non-empty line, without its newline
    pub fn next_line(&mut self) -> Result<Option<Vec<Token>>, ParseError> {
        let mut line = Vec::new();

        while let Some(token) = self.next()? {
            if token.kind == TokenKind::Newline {
                if line.is_empty() {
                    continue;
                }

                return Ok(Some(line));
            }

            line.push(token);
        }

        Ok((!line.is_empty()).then_some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let source = SourceFile::from_memory(source);
        let mut lexer = Lexer::new(&source);
        let mut kinds = Vec::new();

        while let Some(token) = lexer.next().unwrap() {
            kinds.push(token.kind);
        }

        kinds
    }

    #[test]
    fn comments_and_blank_space_produce_no_tokens() {
        assert_eq!(
            kinds("  ; leading comment\nset_result -3 # trailing\n"),
            vec![
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::IntegerLiteral,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn negative_literal_keeps_its_sign_in_the_span() {
        let source = SourceFile::from_memory("set_result -42");
        let mut lexer = Lexer::new(&source);

        lexer.next().unwrap();
        let literal = lexer.next().unwrap().unwrap();

        assert_eq!(source.value_of_span(literal.span), "-42");
        assert_eq!(literal.location, Location { line: 1, column: 12 });
    }

    #[test]
    fn lines_skip_blank_lines() {
        let source = SourceFile::from_memory("main:\n\n\n    call\n");
        let mut lexer = Lexer::new(&source);

        assert_eq!(lexer.next_line().unwrap().unwrap().len(), 2);

        let call = lexer.next_line().unwrap().unwrap();
        assert_eq!(call.len(), 1);
        assert_eq!(call[0].location, Location { line: 4, column: 5 });

        assert!(lexer.next_line().unwrap().is_none());
    }

    #[test]
    fn unexpected_character_reports_its_position() {
        let source = SourceFile::from_memory("main:\n  call @\n");
        let mut lexer = Lexer::new(&source);

        let error = std::iter::from_fn(|| lexer.next().transpose())
            .find_map(Result::err)
            .unwrap();

        assert_eq!(
            error,
            ParseError::UnexpectedCharacter {
                character: '@',
                location: Location { line: 2, column: 8 },
            }
        );
    }
}
