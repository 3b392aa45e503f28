//! L2 is the stack/closure-oriented intermediate form handed to the backend.
//! A program is a flat `main` sequence plus a table of closure bodies, each
//! one a lambda taking exactly one argument. Values flow through a single
//! result slot, operands are staged on the machine stack and variables are
//! addressed by lexical depth instead of by name.

use std::collections::BTreeMap;

pub mod pretty_print;
pub mod validate;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Program {
    pub main: Vec<Instruction>,
    /// Closure bodies keyed by the label their code is emitted under
    pub closures: BTreeMap<Label, Vec<Instruction>>,
}

impl Program {
    pub fn new(main: Vec<Instruction>) -> Self {
        Self {
            main,
            closures: BTreeMap::new(),
        }
    }

    pub fn with_closure(mut self, name: impl Into<Label>, body: Vec<Instruction>) -> Self {
        self.closures.insert(name.into(), body);
        self
    }

    /// Number of instructions across `main` and every closure body
    pub fn instruction_count(&self) -> usize {
        self.main.len() + self.closures.values().map(Vec::len).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Load an integer literal into the result slot
    SetResult(i64),
    /// Push the result slot onto the stack
    PushResult,
    /// Allocate a closure over the given body, capturing the current
    /// environment
    Closure(Label),
    /// Apply the closure on top of the stack to the value in the result slot
    Call,
    /// Read the variable bound `n` scopes out
    Variable(usize),
    /// Overwrite the variable bound `n` scopes out with the result slot
    Set(usize),
    Label(Label),
    Jump(Label),
    /// Jump when the result slot holds zero
    JumpFalse(Label),
}

/// The textual tag of each instruction variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Opcode {
    SetResult,
    PushResult,
    Closure,
    Call,
    Variable,
    Set,
    Label,
    Jump,
    JumpFalse,
}

impl Opcode {
    pub fn operand_kind(self) -> OperandKind {
        match self {
            Opcode::SetResult => OperandKind::Integer,
            Opcode::Variable | Opcode::Set => OperandKind::Depth,
            Opcode::Closure | Opcode::Label | Opcode::Jump | Opcode::JumpFalse => {
                OperandKind::Label
            }
            Opcode::PushResult | Opcode::Call => OperandKind::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum OperandKind {
    #[strum(to_string = "no operand")]
    None,
    #[strum(to_string = "an integer")]
    Integer,
    #[strum(to_string = "a scope depth")]
    Depth,
    #[strum(to_string = "a label")]
    Label,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::SetResult(_) => Opcode::SetResult,
            Instruction::PushResult => Opcode::PushResult,
            Instruction::Closure(_) => Opcode::Closure,
            Instruction::Call => Opcode::Call,
            Instruction::Variable(_) => Opcode::Variable,
            Instruction::Set(_) => Opcode::Set,
            Instruction::Label(_) => Opcode::Label,
            Instruction::Jump(_) => Opcode::Jump,
            Instruction::JumpFalse(_) => Opcode::JumpFalse,
        }
    }

    /// The label this instruction refers to without defining it
    pub fn referenced_label(&self) -> Option<&Label> {
        match self {
            Instruction::Closure(label)
            | Instruction::Jump(label)
            | Instruction::JumpFalse(label) => Some(label),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn opcodes_parse_from_snake_case_tags() {
        assert_eq!(Opcode::from_str("set_result"), Ok(Opcode::SetResult));
        assert_eq!(Opcode::from_str("jump_false"), Ok(Opcode::JumpFalse));
        assert!(Opcode::from_str("jumpFalse").is_err());
        assert_eq!(Opcode::PushResult.to_string(), "push_result");
    }

    #[test]
    fn instruction_count_includes_closure_bodies() {
        let program = Program::new(vec![Instruction::SetResult(1), Instruction::PushResult])
            .with_closure("id", vec![Instruction::Variable(0)]);

        assert_eq!(program.instruction_count(), 3);
    }

    #[test]
    fn only_references_report_a_referenced_label() {
        assert_eq!(
            Instruction::JumpFalse("else".into()).referenced_label(),
            Some(&Label::from("else"))
        );
        assert_eq!(Instruction::Label("else".into()).referenced_label(), None);
    }
}
