use std::path::PathBuf;

use thiserror::Error;

use crate::{frontend::error::ParseError, middle::l2::validate::ValidationError, vm::MachineError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Machine(#[from] MachineError),
}
