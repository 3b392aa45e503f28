//! The backend lowers L2 onto X2. Closures and environments get their heap
//! layout here, calls get their calling convention and booleans their
//! encoding (zero is false).
//!
//! Producing a listing takes three steps:
//! 1. Emit the fixed runtime library.
//! 2. Lower every closure body under its own label.
//! 3. Lower `main` into the entry block, followed by the epilogue and the
//!    heap reservation.

use crate::middle::l2;

pub mod assemblers;
pub mod closure;
pub mod l2_lowering;
pub mod runtime;
pub mod targets;
pub mod x2;

pub use targets::{CodeGenerator, Target};

/// 512 MiB
pub const DEFAULT_HEAP_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    pub target: Target,
    /// Bytes reserved for the heap
    pub heap_size: usize,
    pub epilogue: Epilogue,
    /// Precede each lowered instruction with its L2 form as a comment
    pub emit_debug_info: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            target: Target::default(),
            heap_size: DEFAULT_HEAP_SIZE,
            epilogue: Epilogue::default(),
            emit_debug_info: false,
        }
    }
}

/// What runs between the end of `main` and its final `ret`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Epilogue {
    /// Return the accumulated result to the caller
    #[default]
    ReturnResult,
    Custom(Vec<String>),
}

pub fn assemble(program: &l2::Program, options: &CodegenOptions) -> x2::Listing {
    options.target.get_code_generator().assemble(program, options)
}

pub fn translate_to_asm(program: &l2::Program, options: &CodegenOptions) -> String {
    options
        .target
        .get_code_generator()
        .translate_to_asm(program, options)
}
