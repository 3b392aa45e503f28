use thiserror::Error;

use crate::middle::l2::{Label, Opcode, OperandKind};

/// 1-based position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{location}: unexpected character `{character}`")]
    UnexpectedCharacter { character: char, location: Location },
    #[error("{location}: unrecognized instruction `{tag}`")]
    UnknownInstruction { tag: String, location: Location },
    #[error("{location}: `{opcode}` expects {expected}")]
    MissingOperand {
        opcode: Opcode,
        expected: OperandKind,
        location: Location,
    },
    #[error("{location}: `{opcode}` takes {expected} but found `{found}`")]
    InvalidOperand {
        opcode: Opcode,
        expected: OperandKind,
        found: String,
        location: Location,
    },
    #[error("{location}: unexpected `{found}` at end of instruction")]
    TrailingInput { found: String, location: Location },
    #[error("{location}: instruction outside of a `main:` or `closure <name>:` section")]
    InstructionOutsideSection { location: Location },
    #[error("{location}: malformed section header, expected `main:` or `closure <name>:`")]
    MalformedHeader { location: Location },
    #[error("{location}: section `{name}` is defined more than once")]
    DuplicateSection { name: Label, location: Location },
    #[error("no `main:` section found")]
    MissingMain,
}
