//! Error types for timewarp

use thiserror::Error;

use crate::ClockId;

/// Core timewarp errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarpError {
    /// The real time source reported a failure; `errno` is what it set
    #[error("Real clock {clock:?} failed (errno {errno})")]
    SourceFailed { clock: ClockId, errno: i32 },

    /// A real libc symbol could not be resolved behind the shim
    #[error("Symbol unavailable: {0}")]
    SymbolUnavailable(&'static str),

    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("Sampler thread could not be spawned: {0}")]
    SamplerSpawn(String),
}

impl WarpError {
    /// OS error indicator to hand back to a C caller
    pub fn errno(&self) -> i32 {
        match self {
            WarpError::SourceFailed { errno, .. } => *errno,
            WarpError::SymbolUnavailable(_) => libc::ENOSYS,
            WarpError::InputUnavailable(_) | WarpError::SamplerSpawn(_) => libc::EIO,
        }
    }
}

/// Result type for timewarp operations
pub type WarpResult<T> = Result<T, WarpError>;
