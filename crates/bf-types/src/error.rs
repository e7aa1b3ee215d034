use crate::{Position, SourceBuffer};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Structure,
    Runtime,
    Io,
    Artifact,
    Codegen,
    Config,
}

/// Numeric error code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Structure errors (E100–E199) ──
    pub const UNMATCHED_OPEN: Self = Self(100);
    pub const UNMATCHED_CLOSE: Self = Self(101);

    // ── Runtime errors (E200–E299) ──
    pub const POINTER_OUT_OF_BOUNDS: Self = Self(200);

    // ── I/O errors (E300–E399) ──
    pub const INPUT_FAILED: Self = Self(300);
    pub const OUTPUT_FAILED: Self = Self(301);

    // ── Artifact errors (E400–E499) ──
    pub const ARTIFACT_WRITE: Self = Self(400);
    pub const ARTIFACT_RUN: Self = Self(401);

    // ── Codegen errors (E500–E599) ──
    pub const CODEGEN_FAILED: Self = Self(500);

    // ── Configuration errors (E600–E699) ──
    pub const INVALID_CONFIG: Self = Self(600);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Structure,
            200..=299 => ErrorCategory::Runtime,
            300..=399 => ErrorCategory::Io,
            400..=499 => ErrorCategory::Artifact,
            500..=599 => ErrorCategory::Codegen,
            _ => ErrorCategory::Config,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure => write!(f, "structure"),
            Self::Runtime => write!(f, "runtime"),
            Self::Io => write!(f, "io"),
            Self::Artifact => write!(f, "artifact"),
            Self::Codegen => write!(f, "codegen"),
            Self::Config => write!(f, "config"),
        }
    }
}

/// The two bracket instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bracket {
    Open,
    Close,
}

impl Bracket {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'[' => Some(Self::Open),
            b']' => Some(Self::Close),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Open => '[',
            Self::Close => ']',
        }
    }
}

/// A bracket with no partner inside the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("unmatched '{}' at offset {offset}", .bracket.as_char())]
pub struct BracketError {
    pub bracket: Bracket,
    /// Byte offset of the unmatched bracket.
    pub offset: usize,
}

impl BracketError {
    pub fn new(bracket: Bracket, offset: usize) -> Self {
        Self { bracket, offset }
    }

    pub fn code(&self) -> ErrorCode {
        match self.bracket {
            Bracket::Open => ErrorCode::UNMATCHED_OPEN,
            Bracket::Close => ErrorCode::UNMATCHED_CLOSE,
        }
    }
}

/// An invalid [`crate::MachineConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tape length must be at least 1")]
    EmptyTape,

    #[error("tape length {requested} exceeds the maximum of {max} cells")]
    TapeTooLarge { requested: u32, max: u32 },

    #[error("malformed configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::INVALID_CONFIG
    }
}

/// A structured error report for callers that render errors.
///
/// The core never prints; front ends serialise or format these instead of
/// parsing free-form messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source name (empty when the error is not tied to a source).
    pub file: String,
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    /// Offending location, when the error has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// The source line containing `position`, for context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic without a location.
    pub fn new(file: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            position: None,
            source_line: None,
        }
    }

    /// Create a diagnostic anchored at a byte offset of `source`.
    pub fn at(
        source: &SourceBuffer,
        offset: usize,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        let position = source.position(offset);
        let mut diagnostic = Self::new(source.name(), code, message);
        diagnostic.source_line = source.line(position.line);
        diagnostic.position = Some(position);
        diagnostic
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(pos) => write!(
                f,
                "{}:{}: {} [{}] {}",
                self.file, pos, self.code, self.category, self.message
            ),
            None => write!(
                f,
                "{}: {} [{}] {}",
                self.file, self.code, self.category, self.message
            ),
        }
    }
}
