//! X2 is the register, stack and heap machine the backend targets. It is
//! written out as AT&T syntax x86-64 assembly but only a handful of
//! instruction forms are ever produced.

pub mod instruction;
pub mod listing;
pub mod operand;

pub use instruction::Instruction;
pub use listing::{Directive, Line, Listing};
pub use operand::{ByteRegister, CELL_SIZE, Register, Symbol};
