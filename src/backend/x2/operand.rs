//! Operands of X2 instructions. Registers are named by the role they play in
//! the generated code, never by their machine name; see
//! [`Register::machine_register`](crate::backend::assemblers::x86_64) for the
//! mapping onto real registers.

use crate::backend::targets::Target;

/// Every heap and stack cell is one machine word
pub const CELL_SIZE: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum Register {
    /// Scratch value, clobbered by every protocol sequence
    Temp,
    /// Expression value, call argument and return value
    Result,
    /// First free heap cell
    Next,
    /// Innermost environment frame
    Env,
    StackPointer,
}

/// The single byte register written by `setl`. Only valid directly after a
/// compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteRegister {
    ComparisonResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Immediate(pub i64);

pub fn constant(value: i64) -> Immediate {
    Immediate(value)
}

/// The cell at `base + CELL_SIZE * offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dereference {
    pub base: Register,
    pub offset: i64,
}

pub fn dereference(base: Register, offset: i64) -> Dereference {
    Dereference { base, offset }
}

impl Dereference {
    pub fn displacement(self) -> i64 {
        self.offset * CELL_SIZE
    }
}

/// A symbolic code or data address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The name as it appears in the output for `target`
    pub fn mangled(&self, target: Target) -> String {
        mangle(&self.0, target)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&crate::middle::l2::Label> for Symbol {
    fn from(value: &crate::middle::l2::Label) -> Self {
        Self::new(value.as_str())
    }
}

pub fn mangle(name: &str, target: Target) -> String {
    if target.mangles_symbols() {
        format!("_{name}")
    } else {
        name.to_owned()
    }
}

/// Position independent address of `symbol`, only usable as the source of
/// a `leaq`
pub fn label_reference(symbol: &Symbol, target: Target) -> String {
    format!("{}(%rip)", symbol.mangled(target))
}

pub fn label_definition(symbol: &Symbol, target: Target) -> String {
    format!("{}:", symbol.mangled(target))
}

/// Source and destination of a two operand instruction. There is no memory
/// to memory form, and an immediate can only ever be the first (source)
/// operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    RegisterToRegister {
        source: Register,
        destination: Register,
    },
    ImmediateToRegister {
        source: Immediate,
        destination: Register,
    },
    MemoryToRegister {
        source: Dereference,
        destination: Register,
    },
    RegisterToMemory {
        source: Register,
        destination: Dereference,
    },
    ImmediateToMemory {
        source: Immediate,
        destination: Dereference,
    },
}

impl From<(Register, Register)> for Operands {
    fn from((source, destination): (Register, Register)) -> Self {
        Self::RegisterToRegister {
            source,
            destination,
        }
    }
}

impl From<(Immediate, Register)> for Operands {
    fn from((source, destination): (Immediate, Register)) -> Self {
        Self::ImmediateToRegister {
            source,
            destination,
        }
    }
}

impl From<(Dereference, Register)> for Operands {
    fn from((source, destination): (Dereference, Register)) -> Self {
        Self::MemoryToRegister {
            source,
            destination,
        }
    }
}

impl From<(Register, Dereference)> for Operands {
    fn from((source, destination): (Register, Dereference)) -> Self {
        Self::RegisterToMemory {
            source,
            destination,
        }
    }
}

impl From<(Immediate, Dereference)> for Operands {
    fn from((source, destination): (Immediate, Dereference)) -> Self {
        Self::ImmediateToMemory {
            source,
            destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dereference_scales_by_cell_size() {
        assert_eq!(dereference(Register::Next, 1).displacement(), 8);
        assert_eq!(dereference(Register::Temp, 0).displacement(), 0);
        assert_eq!(dereference(Register::Env, -2).displacement(), -16);
    }

    #[test]
    fn mangling_depends_only_on_the_target() {
        let symbol = Symbol::from("lambda_3");

        assert_eq!(symbol.mangled(Target::x86_64LinuxGnu), "lambda_3");
        assert_eq!(symbol.mangled(Target::x86_64AppleDarwin), "_lambda_3");
        assert_eq!(
            label_reference(&symbol, Target::x86_64AppleDarwin),
            "_lambda_3(%rip)"
        );
        assert_eq!(label_definition(&symbol, Target::x86_64LinuxGnu), "lambda_3:");
    }

    #[test]
    fn operand_pairs_keep_source_first() {
        assert_eq!(
            Operands::from((constant(0), Register::Result)),
            Operands::ImmediateToRegister {
                source: Immediate(0),
                destination: Register::Result,
            }
        );
    }
}
