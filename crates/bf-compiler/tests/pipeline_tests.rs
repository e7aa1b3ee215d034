//! End-to-end pipeline tests.
//!
//! Tests verify both modes from source text: interpretation, in-memory
//! compilation, artifact execution, diagnostics and runner limits.

use std::io::{self, Cursor};

use bf_codegen::types::EXIT_IO_FAILURE;
use bf_compiler::{
    compile, interpret, run_artifact, ArtifactRunner, RunError, RunnerConfig, ToDiagnostic,
};
use bf_eval::{ByteOutput, EvalError, ReadInput, WriteOutput};
use bf_types::{ErrorCode, MachineConfig, SourceBuffer};

const HELLO_WORLD: &str = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]\
                           >>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

struct BrokenPipe;

impl ByteOutput for BrokenPipe {
    fn write_byte(&mut self, _byte: u8) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Scenarios
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn scenario_hello_world_both_modes() {
    let source = SourceBuffer::new("hello.b", HELLO_WORLD);
    let config = MachineConfig::default();

    let mut out = Vec::new();
    interpret(&source, config, &b""[..], &mut out).expect("interprets");
    assert_eq!(out, b"Hello World!\n");

    let compiled = compile(&source, &config, "hello").expect("compiles");
    let report = run_artifact(&compiled.wasm, &b""[..], Vec::new()).expect("runs");
    assert!(report.success());
    assert_eq!(report.output, b"Hello World!\n");
}

#[test]
fn scenario_echo_both_modes() {
    let source = SourceBuffer::new("echo.b", ",.");
    let config = MachineConfig::default();

    let mut out = Vec::new();
    let stats = interpret(&source, config, &b"A"[..], &mut out).expect("interprets");
    assert_eq!(out, vec![0x41]);
    assert_eq!(stats.bytes_read, 1);

    let compiled = compile(&source, &config, "echo").expect("compiles");
    let report = run_artifact(&compiled.wasm, &b"A"[..], Vec::new()).expect("runs");
    assert_eq!(report.output, vec![0x41]);
}

#[test]
fn compile_output_carries_metadata() {
    let source = SourceBuffer::new("hello.b", HELLO_WORLD);
    let config = MachineConfig::canonical();
    let compiled = compile(&source, &config, "hello").expect("compiles");
    assert_eq!(compiled.metadata.module_name, "hello");
    assert_eq!(compiled.metadata.config, config);
    assert!(compiled.metadata.matches_source(source.bytes()));

    let json = serde_json::to_string(&compiled).unwrap();
    let back: bf_compiler::CompileOutput = serde_json::from_str(&json).unwrap();
    assert_eq!(back, compiled);
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors and diagnostics
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn unmatched_bracket_fails_both_modes() {
    let source = SourceBuffer::new("bad.b", "+\n[");
    let eval_err = interpret(&source, MachineConfig::default(), &b""[..], Vec::new())
        .unwrap_err();
    let compile_err = compile(&source, &MachineConfig::default(), "bad").unwrap_err();

    let from_eval = eval_err.to_diagnostic(&source);
    let from_compile = compile_err.to_diagnostic(&source);
    assert_eq!(from_eval, from_compile);
    assert_eq!(from_eval.code, ErrorCode::UNMATCHED_OPEN);
    assert_eq!(from_eval.to_string(), "bad.b:2:1: E100 [structure] unmatched '[' at offset 2");

    let json = from_eval.to_json();
    assert!(json.contains("\"code\":100"));
    assert!(json.contains("\"line\":2"));
}

#[test]
fn output_failure_in_both_modes() {
    let source = SourceBuffer::new("out.b", "+.");
    let err = interpret(&source, MachineConfig::default(), &b""[..], BrokenPipe).unwrap_err();
    assert!(matches!(err, EvalError::OutputFailed { .. }));
    assert_eq!(err.to_diagnostic(&source).code, ErrorCode::OUTPUT_FAILED);

    let compiled = compile(&source, &MachineConfig::default(), "out").unwrap();
    let report = run_artifact(&compiled.wasm, &b""[..], BrokenPipe).expect("module exits");
    assert_eq!(report.exit_code, EXIT_IO_FAILURE);
}

// ══════════════════════════════════════════════════════════════════════════════
// Runner
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn fuel_bounds_an_infinite_loop() {
    let source = SourceBuffer::new("spin.b", "+[]");
    let compiled = compile(&source, &MachineConfig::default(), "spin").unwrap();
    let runner = ArtifactRunner::new(RunnerConfig::with_fuel(100_000));
    let err = runner.run(&compiled.wasm, &b""[..], Vec::new()).unwrap_err();
    assert!(matches!(err, RunError::OutOfFuel));
    assert_eq!(err.code(), ErrorCode::ARTIFACT_RUN);
}

#[test]
fn fuel_is_enough_for_small_programs() {
    let source = SourceBuffer::new("hello.b", HELLO_WORLD);
    let compiled = compile(&source, &MachineConfig::default(), "hello").unwrap();
    let runner = ArtifactRunner::new(RunnerConfig::with_fuel(10_000_000));
    let report = runner.run(&compiled.wasm, &b""[..], Vec::new()).unwrap();
    assert_eq!(report.output, b"Hello World!\n");
}

#[test]
fn module_without_entry_point_is_rejected() {
    let empty_module = b"\0asm\x01\0\0\0";
    let err = run_artifact(empty_module, &b""[..], Vec::new()).unwrap_err();
    assert!(matches!(err, RunError::MissingExport("_start")));
}

#[test]
fn runner_config_from_json() {
    let config: RunnerConfig = serde_json::from_str(r#"{"fuel":5}"#).unwrap();
    assert_eq!(config, RunnerConfig::with_fuel(5));
    let config: RunnerConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.fuel, None);
}

#[test]
fn owned_streams_are_handed_back() {
    let source = SourceBuffer::new("cat.b", ",[.,]");
    let config = MachineConfig::canonical().with_eof_policy(bf_types::EofPolicy::Zero);
    let compiled = compile(&source, &config, "cat").unwrap();

    let input = ReadInput(Cursor::new(b"abc".to_vec()));
    let report = run_artifact(&compiled.wasm, input, WriteOutput(Vec::new())).unwrap();
    assert!(report.success());
    assert_eq!(report.output.0, b"abc");
}

#[test]
fn fault_message_is_readable_from_the_report() {
    let source = SourceBuffer::new("fault.b", "+<.");
    let compiled = compile(&source, &MachineConfig::reference(), "fault").unwrap();
    let report = run_artifact(&compiled.wasm, &b""[..], Vec::new()).unwrap();
    assert!(!report.success());
    assert_eq!(report.stderr_text(), "data pointer out of bounds at offset 2\n");
}
