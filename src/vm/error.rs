use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("symbol `{0}` is not defined in the listing")]
    UndefinedSymbol(String),
    #[error("symbol `{0}` is defined more than once")]
    DuplicateSymbol(String),
    #[error("`{0}` names data, not code")]
    NotCode(String),
    #[error("control transfer to {address:#x}, which is not a code address")]
    InvalidCodeAddress { address: u64 },
    #[error("a heap of {size} bytes does not fit below the stack")]
    HeapTooLarge { size: u64 },
    #[error("memory access at {address:#x} is outside the heap and the stack")]
    OutOfBounds { address: u64 },
    #[error("memory access at {address:#x} is not cell aligned")]
    Misaligned { address: u64 },
    #[error("execution ran past the last instruction")]
    FellOffEnd,
    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),
}
