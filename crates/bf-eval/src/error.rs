//! Runtime error types for the interpreter.

use std::io;

use bf_types::{BracketError, ConfigError, ErrorCode};
use thiserror::Error;

/// Evaluation error. Every variant aborts the current run.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Unbalanced source, found by the pre-pass or when the bracket is reached.
    #[error(transparent)]
    UnmatchedBracket(#[from] BracketError),

    /// A cell outside the tape was touched under the faulting pointer policy.
    #[error("data pointer out of bounds at offset {offset}")]
    PointerOutOfBounds { offset: usize, pointer: i32 },

    #[error("failed to read input at offset {offset}: {source}")]
    InputFailed {
        offset: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output at offset {offset}: {source}")]
    OutputFailed {
        offset: usize,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl EvalError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnmatchedBracket(err) => err.code(),
            Self::PointerOutOfBounds { .. } => ErrorCode::POINTER_OUT_OF_BOUNDS,
            Self::InputFailed { .. } => ErrorCode::INPUT_FAILED,
            Self::OutputFailed { .. } => ErrorCode::OUTPUT_FAILED,
            Self::InvalidConfig(err) => err.code(),
        }
    }

    /// Source offset of the instruction that failed, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::UnmatchedBracket(err) => Some(err.offset),
            Self::PointerOutOfBounds { offset, .. }
            | Self::InputFailed { offset, .. }
            | Self::OutputFailed { offset, .. } => Some(*offset),
            Self::InvalidConfig(_) => None,
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
