//! Pipeline and runner error types.

use std::io;
use std::path::PathBuf;

use bf_codegen::CodegenError;
use bf_types::ErrorCode;
use thiserror::Error;

/// Errors from compiling to a module or writing it out.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// The artifact could not be written. No partial file is left behind.
    #[error("failed to write artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Codegen(err) => err.code(),
            Self::ArtifactWrite { .. } => ErrorCode::ARTIFACT_WRITE,
        }
    }

    /// Source offset of the offending bracket, for unbalanced source.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Codegen(CodegenError::UnmatchedBracket(err)) => Some(err.offset),
            _ => None,
        }
    }
}

/// Compile result type alias.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors from executing an artifact. A program that exits, with any status,
/// is not an error.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to load module: {0}")]
    Load(#[source] wasmi::Error),

    #[error("failed to instantiate module: {0}")]
    Instantiate(#[source] wasmi::Error),

    #[error("module does not export `{0}`")]
    MissingExport(&'static str),

    #[error("fuel exhausted")]
    OutOfFuel,

    #[error("module trapped: {0}")]
    Trap(#[source] wasmi::Error),
}

impl RunError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ARTIFACT_RUN
    }
}
