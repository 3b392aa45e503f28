//! `l2c` lowers L2 programs onto X2, a small register/stack/heap machine
//! written out as x86-64 assembly, and can execute the result in a
//! simulator.

use std::path::Path;

use crate::{
    backend::{
        CodegenOptions,
        runtime::RUNTIME_SYMBOLS,
        targets::x86_64::{ENTRY_POINT, HEAP},
    },
    frontend::{SourceFile, parser::Parser},
    middle::l2::{self, validate::ValidationError},
    vm::{Machine, MachineConfig, Outcome},
};

pub mod backend;
pub mod error;
pub mod frontend;
pub mod middle;
pub mod vm;

pub use error::Error;

pub fn read_program(path: &Path) -> Result<l2::Program, Error> {
    let source = SourceFile::read(path.to_path_buf()).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Parser::parse_program(&source)?)
}

/// Validates `program` against every symbol the generated listing defines
/// besides the program's own
pub fn validate_program(program: &l2::Program) -> Result<(), ValidationError> {
    l2::validate::validate(
        program,
        RUNTIME_SYMBOLS.iter().copied().chain([ENTRY_POINT, HEAP]),
    )
}

pub fn compile(
    program: &l2::Program,
    options: &CodegenOptions,
    validate: bool,
) -> Result<String, Error> {
    let _span = tracing::info_span!("compile", target = ?options.target).entered();

    if validate {
        validate_program(program)?;
    }

    Ok(backend::translate_to_asm(program, options))
}

/// Lowers `program` and runs the listing in the simulator. The program is
/// always validated first since the simulator resolves every symbol.
pub fn run(
    program: &l2::Program,
    options: &CodegenOptions,
    config: MachineConfig,
) -> Result<Outcome, Error> {
    let _span = tracing::info_span!("run", max_steps = config.max_steps).entered();

    validate_program(program)?;

    let listing = backend::assemble(program, options);
    let outcome = Machine::load(&listing, config)?.run()?;

    Ok(outcome)
}
