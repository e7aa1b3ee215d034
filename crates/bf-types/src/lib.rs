//! Shared types for the tape machine.
//!
//! This crate defines the source buffer, the instruction set, the machine
//! configuration both backends honour, and the error codes used across the
//! interpreter, code generator and pipeline.

mod config;
mod error;
mod instruction;
mod source;

pub use config::{
    CellWidth, EofPolicy, MachineConfig, PointerPolicy, DEFAULT_TAPE_LEN, MAX_TAPE_LEN,
};
pub use error::{Bracket, BracketError, ConfigError, Diagnostic, ErrorCategory, ErrorCode};
pub use instruction::Instruction;
pub use source::{Position, SourceBuffer};
