//! Tape machine toolchain: orchestrates both execution modes.
//!
//! ```text
//! mode a:  SourceBuffer → Interpreter ─────────────────────────→ output
//! mode b:  SourceBuffer → BracketMap → Codegen → .wasm ─→ runner → output
//! ```
//!
//! Both modes read the same [`MachineConfig`] and produce the same output
//! for the same source and input.

pub mod diagnostic;
pub mod emitter;
pub mod error;
pub mod runner;

use bf_codegen::ArtifactMetadata;
use bf_eval::{ByteInput, ByteOutput, EvalResult, RunStats};
use bf_types::{MachineConfig, SourceBuffer};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub use diagnostic::ToDiagnostic;
pub use emitter::{artifact_path, emit_executable};
pub use error::{CompileError, CompileResult, RunError};
pub use runner::{run_artifact, ArtifactRunner, RunReport, RunnerConfig};

/// A module compiled in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutput {
    pub wasm: Vec<u8>,
    pub metadata: ArtifactMetadata,
}

/// Mode a: interpret `source` over the given streams.
#[instrument(skip_all, fields(source = %source.name()))]
pub fn interpret<I, O>(
    source: &SourceBuffer,
    config: MachineConfig,
    input: I,
    output: O,
) -> EvalResult<RunStats>
where
    I: ByteInput,
    O: ByteOutput,
{
    bf_eval::interpret(source, config, input, output)
}

/// Mode b, in memory: compile `source` into a module named `name`.
#[instrument(skip_all, fields(source = %source.name(), name))]
pub fn compile(
    source: &SourceBuffer,
    config: &MachineConfig,
    name: &str,
) -> CompileResult<CompileOutput> {
    let (wasm, metadata) = bf_codegen::compile_with_metadata(source, config, name)?;
    debug!(bytes = wasm.len(), "compiled");
    Ok(CompileOutput { wasm, metadata })
}
