//! Tape machine WASM code generator: compiles a source buffer to `.wasm`.
//!
//! # Architecture
//!
//! Brackets are resolved and checked before anything is emitted. The module
//! is then assembled around a single generated function, `run`, holding one
//! lowered sequence per recognised source byte in source order. Loops map
//! onto structured `block`/`loop` pairs, so no dispatch happens at run time.
//!
//! ## Imports (`wasi_snapshot_preview1`)
//! - `fd_read(fd, iovs, iovs_len, nread) → errno`
//! - `fd_write(fd, iovs, iovs_len, nwritten) → errno`
//! - `proc_exit(code)`
//!
//! ## Exports
//! - `_start`: WASI command entry point, runs the program
//! - `run`: the program itself, callable repeatedly
//! - `memory`: linear memory (scratch area followed by the tape)
//!
//! ## Exit status
//! - `0` when the program halts
//! - [`types::EXIT_POINTER_FAULT`] after a data pointer fault
//! - [`types::EXIT_IO_FAILURE`] when a stream operation fails
//!
//! ## Custom sections
//! The source text is embedded in `bf.source` and an [`ArtifactMetadata`]
//! JSON document in `bf.meta`; see [`read_source`] and [`read_metadata`].

pub mod compiler;
pub mod error;
pub mod lower;
pub mod metadata;
pub mod runtime;
pub mod types;

pub use compiler::{compile, compile_named, compile_with_metadata};
pub use error::{CodegenError, CodegenResult};
pub use metadata::{read_metadata, read_source, ArtifactMetadata};
