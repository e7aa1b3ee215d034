//! Interpreter ↔ artifact equivalence.
//!
//! Every program is run through the interpreter and through its compiled
//! module (via the wasmi runner), and the observable behaviour compared:
//! - same output bytes
//! - exit status 0 when the interpreter halts
//! - exit status 70 and the interpreter's error message on stderr when the
//!   data pointer faults

use std::io::Cursor;

use bf_codegen::types::EXIT_POINTER_FAULT;
use bf_compiler::{compile, interpret, run_artifact};
use bf_eval::{EvalError, ReadInput};
use bf_types::{CellWidth, EofPolicy, MachineConfig, PointerPolicy, SourceBuffer};
use quickcheck::{Arbitrary, Gen, QuickCheck};

// ══════════════════════════════════════════════════════════════════════════════
// Harness
// ══════════════════════════════════════════════════════════════════════════════

const HELLO_WORLD: &str = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]\
                           >>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

/// Outcome of one run, in the shape both backends can produce.
#[derive(Debug, PartialEq, Eq)]
struct Observed {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn interpreted(code: &str, config: MachineConfig, input: &[u8]) -> Observed {
    let source = SourceBuffer::new("case.b", code);
    let mut stdout = Vec::new();
    match interpret(&source, config, input, &mut stdout) {
        Ok(_) => Observed {
            exit_code: 0,
            stdout,
            stderr: Vec::new(),
        },
        Err(err @ EvalError::PointerOutOfBounds { .. }) => Observed {
            exit_code: EXIT_POINTER_FAULT,
            stdout,
            stderr: format!("{err}\n").into_bytes(),
        },
        Err(err) => panic!("interpreter failed on {code:?}: {err}"),
    }
}

fn compiled(code: &str, config: MachineConfig, input: &[u8]) -> Observed {
    let source = SourceBuffer::new("case.b", code);
    let output = compile(&source, &config, "case")
        .unwrap_or_else(|e| panic!("compile failed on {code:?}: {e}"));
    let report = run_artifact(
        &output.wasm,
        ReadInput(Cursor::new(input.to_vec())),
        Vec::new(),
    )
    .unwrap_or_else(|e| panic!("artifact failed on {code:?}: {e}"));
    Observed {
        exit_code: report.exit_code,
        stdout: report.output,
        stderr: report.stderr,
    }
}

fn all_configs() -> Vec<MachineConfig> {
    let mut configs = Vec::new();
    for width in [CellWidth::U8, CellWidth::U16] {
        for pointer in [PointerPolicy::Wrap, PointerPolicy::Fault] {
            for eof in [EofPolicy::Unchanged, EofPolicy::Zero, EofPolicy::AllOnes] {
                configs.push(
                    MachineConfig::reference()
                        .with_cell_width(width)
                        .with_pointer_policy(pointer)
                        .with_eof_policy(eof),
                );
            }
        }
    }
    configs
}

// ══════════════════════════════════════════════════════════════════════════════
// Generators
// ══════════════════════════════════════════════════════════════════════════════

/// A program that always terminates, with input and configuration.
///
/// Loops come only from templates whose body drives the tested cell to zero
/// and returns to it, which holds on tapes of at least two cells.
#[derive(Debug, Clone)]
struct Case {
    code: String,
    input: Vec<u8>,
    config: MachineConfig,
}

impl Arbitrary for Case {
    fn arbitrary(g: &mut Gen) -> Self {
        const PIECES: &[&str] = &[
            "+", "+", "+", "-", "-", ">", ">", "<", ".", ".", ",", "[-]", "[>+<-]", "++++++++",
            "comment",
        ];
        let len = usize::arbitrary(g) % (g.size() + 1);
        let code = (0..len)
            .map(|_| *g.choose(PIECES).expect("non-empty"))
            .collect::<String>();

        let input_len = usize::arbitrary(g) % 8;
        let input = (0..input_len).map(|_| u8::arbitrary(g)).collect();

        let config = MachineConfig::reference()
            .with_tape_len(*g.choose(&[2, 3, 8, 30_000]).expect("non-empty"))
            .with_cell_width(*g.choose(&[CellWidth::U8, CellWidth::U16]).expect("non-empty"))
            .with_pointer_policy(
                *g.choose(&[PointerPolicy::Wrap, PointerPolicy::Fault])
                    .expect("non-empty"),
            )
            .with_eof_policy(
                *g.choose(&[EofPolicy::Unchanged, EofPolicy::Zero, EofPolicy::AllOnes])
                    .expect("non-empty"),
            );

        Case {
            code,
            input,
            config,
        }
    }
}

fn backends_agree(case: Case) -> bool {
    let expected = interpreted(&case.code, case.config, &case.input);
    let actual = compiled(&case.code, case.config, &case.input);
    expected == actual
}

#[test]
fn prop_backends_agree() {
    QuickCheck::new()
        .tests(200)
        .quickcheck(backends_agree as fn(Case) -> bool);
}

// ══════════════════════════════════════════════════════════════════════════════
// Fixed programs under every configuration
// ══════════════════════════════════════════════════════════════════════════════

fn assert_agree(code: &str, input: &[u8]) {
    for config in all_configs() {
        assert_eq!(
            interpreted(code, config, input),
            compiled(code, config, input),
            "backends disagree on {code:?} with {config:?}"
        );
    }
}

#[test]
fn hello_world_agrees() {
    assert_agree(HELLO_WORLD, b"");
    assert_eq!(
        compiled(HELLO_WORLD, MachineConfig::reference(), b"").stdout,
        b"Hello World!\n"
    );
}

#[test]
fn echo_agrees() {
    assert_agree(",.", b"A");
    assert_agree(",.,.,.", b"AB");
    assert_eq!(
        compiled(",.", MachineConfig::canonical(), b"A").stdout,
        vec![0x41]
    );
}

#[test]
fn wraparound_agrees() {
    assert_agree("-.", b"");
    assert_agree(&("+".repeat(256) + "[>+<[-]]>."), b"");
    assert_agree(&("-".repeat(300) + "."), b"");
}

#[test]
fn pointer_fault_agrees() {
    assert_agree("+.<+.", b"");
    assert_agree("<,.", b"xyz");
    assert_agree("+[<]", b"");

    let observed = compiled("++.<<-", MachineConfig::reference(), b"");
    assert_eq!(observed.exit_code, EXIT_POINTER_FAULT);
    assert_eq!(observed.stdout, vec![2]);
    assert_eq!(observed.stderr, b"data pointer out of bounds at offset 5\n");
}

#[test]
fn fault_past_the_end_agrees() {
    let config = MachineConfig::reference().with_tape_len(4);
    let code = ">>>>>>+";
    assert_eq!(interpreted(code, config, b""), compiled(code, config, b""));
    assert_eq!(compiled(code, config, b"").exit_code, EXIT_POINTER_FAULT);
}

#[test]
fn nested_loops_agree() {
    assert_agree("+++[>++[>++++<-]<-]>>.", b"");
    assert_agree("++[>++[>++[>++<-]<-]<-]>>>.", b"");
}

#[test]
fn input_until_eof_agrees() {
    let config = MachineConfig::canonical().with_eof_policy(EofPolicy::Zero);
    let code = ",[.,]";
    let observed = compiled(code, config, b"hello");
    assert_eq!(observed, interpreted(code, config, b"hello"));
    assert_eq!(observed.stdout, b"hello");
}

#[test]
fn high_offsets_print_every_digit() {
    let code = " ".repeat(1_234_567) + "<+";
    let observed = compiled(&code, MachineConfig::reference(), b"");
    assert_eq!(
        observed.stderr,
        b"data pointer out of bounds at offset 1234568\n"
    );
    assert_eq!(observed, interpreted(&code, MachineConfig::reference(), b""));
}

// ══════════════════════════════════════════════════════════════════════════════
// Large programs
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn long_straight_line_program_agrees() {
    let config = MachineConfig::reference();
    for n in [33_000, 40_000, 70_000] {
        let code = "+".repeat(n) + "[-]+.";
        let observed = compiled(&code, config, b"");
        assert_eq!(observed.exit_code, 0);
        assert_eq!(observed.stdout, vec![1]);
        assert_eq!(observed, interpreted(&code, config, b""));
    }
}

#[test]
fn long_loop_bodies_agree() {
    // Outer and inner loop each run once; cell 1 ends at 12_000 % 256 == 224.
    let code = "+[-+[-".to_string() + &">+<".repeat(12_000) + "]]>.";
    let observed = compiled(&code, MachineConfig::reference(), b"");
    assert_eq!(observed.stdout, vec![224]);
    assert_eq!(observed, interpreted(&code, MachineConfig::reference(), b""));
}

#[test]
fn fault_deep_in_a_long_program_agrees() {
    let code = "+".repeat(50_000) + "<<.";
    let observed = compiled(&code, MachineConfig::reference(), b"");
    assert_eq!(observed.exit_code, EXIT_POINTER_FAULT);
    assert_eq!(
        observed.stderr,
        b"data pointer out of bounds at offset 50002\n"
    );
    assert_eq!(observed, interpreted(&code, MachineConfig::reference(), b""));
}
