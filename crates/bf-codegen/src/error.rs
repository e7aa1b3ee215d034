//! Codegen error types.

use bf_types::{BracketError, ConfigError, ErrorCode};
use thiserror::Error;

/// Errors that can occur during WASM code generation.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The source is unbalanced; nothing was emitted.
    #[error(transparent)]
    UnmatchedBracket(#[from] BracketError),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// The source or tape does not fit the module's 32-bit address space.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// The generated WASM module failed validation.
    #[error("WASM validation failed: {0}")]
    ValidationFailed(String),

    /// A module handed to [`crate::read_metadata`] could not be parsed.
    #[error("malformed module: {0}")]
    MalformedModule(String),

    /// Embedded metadata could not be encoded or decoded.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl CodegenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnmatchedBracket(err) => err.code(),
            Self::InvalidConfig(err) => err.code(),
            _ => ErrorCode::CODEGEN_FAILED,
        }
    }
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
