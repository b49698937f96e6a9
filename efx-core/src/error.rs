//! Error types for the engine, mapped 1:1 onto a small set of caller-facing
//! return codes.

use thiserror::Error;

/// Return codes a host wrapper can translate to its own ABI's integer status
/// without reaching into the error's `Display` text. Kept as a separate
/// enum from [`EfxError`] for that reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Success,
    InvalidArgument,
    OutOfRange,
    NullAddress,
    NoData,
    OutOfMemory,
}

#[derive(Error, Debug)]
pub enum EfxError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("null address: {0}")]
    NullAddress(String),

    #[error("allocation failed: {0}")]
    OutOfMemory(String),
}

impl EfxError {
    pub fn code(&self) -> ReturnCode {
        match self {
            EfxError::InvalidArgument(_) => ReturnCode::InvalidArgument,
            EfxError::OutOfRange(_) => ReturnCode::OutOfRange,
            EfxError::NullAddress(_) => ReturnCode::NullAddress,
            EfxError::OutOfMemory(_) => ReturnCode::OutOfMemory,
        }
    }
}

/// Result type alias used throughout the engine.
pub type EfxResult<T> = Result<T, EfxError>;
