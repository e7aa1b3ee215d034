//! Conversion of pipeline errors into [`Diagnostic`]s.

use bf_codegen::CodegenError;
use bf_eval::EvalError;
use bf_types::{Diagnostic, ErrorCode, SourceBuffer};

use crate::error::{CompileError, RunError};

/// Render an error as a structured diagnostic against the source it came from.
pub trait ToDiagnostic {
    fn to_diagnostic(&self, source: &SourceBuffer) -> Diagnostic;
}

fn build(
    source: &SourceBuffer,
    code: ErrorCode,
    offset: Option<usize>,
    message: String,
) -> Diagnostic {
    match offset {
        Some(offset) => Diagnostic::at(source, offset, code, message),
        None => Diagnostic::new(source.name(), code, message),
    }
}

impl ToDiagnostic for EvalError {
    fn to_diagnostic(&self, source: &SourceBuffer) -> Diagnostic {
        build(source, self.code(), self.offset(), self.to_string())
    }
}

impl ToDiagnostic for CodegenError {
    fn to_diagnostic(&self, source: &SourceBuffer) -> Diagnostic {
        let offset = match self {
            CodegenError::UnmatchedBracket(err) => Some(err.offset),
            _ => None,
        };
        build(source, self.code(), offset, self.to_string())
    }
}

impl ToDiagnostic for CompileError {
    fn to_diagnostic(&self, source: &SourceBuffer) -> Diagnostic {
        match self {
            Self::Codegen(err) => err.to_diagnostic(source),
            _ => build(source, self.code(), self.offset(), self.to_string()),
        }
    }
}

impl ToDiagnostic for RunError {
    fn to_diagnostic(&self, source: &SourceBuffer) -> Diagnostic {
        build(source, self.code(), None, self.to_string())
    }
}
