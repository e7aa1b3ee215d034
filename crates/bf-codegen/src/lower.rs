//! Lowering of source instructions into the body of `run`.
//!
//! Dispatch happens here, at generation time: each recognised byte becomes a
//! short straight-line sequence, and unrecognised bytes emit nothing.
//!
//! Brackets lower to structured control flow. For a pair `[ body ]`:
//!
//! ```text
//! block               ;; `[`
//!   <cell> i32.eqz
//!   br_if 0           ;; zero: continue after the matching `]`
//!   loop
//!     body
//!     <cell>          ;; `]`
//!     br_if 0         ;; non-zero: continue after the matching `[`
//!   end
//! end
//! ```
//!
//! The nesting of `block`/`loop` follows the nesting of the brackets, so the
//! source must be balanced before lowering starts.
//!
//! ## Chunks
//!
//! Every bounds check carries its source offset as a constant, and engines
//! cap the number of distinct constants per function. A sequence heavier
//! than [`CHUNK_WEIGHT`] is therefore split into groups, each outlined into
//! a chunk function `(dp: i32) -> i32` that takes and returns the data
//! pointer. A loop heavier than the limit gets a chunk of its own holding the
//! bracket pair, with its body split the same way. Every function, `run`
//! included, then holds at most [`CHUNK_WEIGHT`] lowered instructions.

use bf_types::{CellWidth, EofPolicy, Instruction, MachineConfig, PointerPolicy};
use wasm_encoder::{BlockType, Function, Instruction as Op, ValType};

use crate::runtime::{
    chunk_func_idx, memarg, rt_func_idx, RT_POINTER_FAULT, RT_READ_BYTE, RT_WRITE_BYTE,
};
use crate::types::TAPE_BASE;

/// Data pointer, an i32 cell index. In chunks it is the parameter.
pub const LOCAL_DP: u32 = 0;
/// Result of the last `read_byte` call.
pub const LOCAL_BYTE: u32 = 1;

/// Most instructions lowered into one function; a bracket pair counts two.
pub const CHUNK_WEIGHT: usize = 8192;

/// `run` plus the chunks outlined from it, in function index order.
#[derive(Debug)]
pub struct LoweredProgram {
    pub run: Function,
    pub chunks: Vec<Function>,
}

/// Emit `run()` and its chunks for a balanced source.
pub fn emit_run(code: &[u8], config: &MachineConfig) -> LoweredProgram {
    let nodes = parse(code);
    let mut run = Function::new(vec![(2, ValType::I32)]);

    // Fresh tape for every call.
    run.instruction(&Op::I32Const(TAPE_BASE as i32));
    run.instruction(&Op::I32Const(0));
    run.instruction(&Op::I32Const(config.tape_bytes() as i32));
    run.instruction(&Op::MemoryFill(0));
    run.instruction(&Op::I32Const(0));
    run.instruction(&Op::LocalSet(LOCAL_DP));

    let mut lowerer = Lowerer {
        config,
        chunks: Vec::new(),
    };
    lowerer.emit_sequence(&mut run, &nodes);
    run.instruction(&Op::End);

    LoweredProgram {
        run,
        chunks: lowerer.chunks,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Loop tree
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
enum Node {
    Op(Instruction, u32),
    Loop {
        open: u32,
        close: u32,
        body: Vec<Node>,
        weight: usize,
    },
}

impl Node {
    fn weight(&self) -> usize {
        match self {
            Self::Op(..) => 1,
            Self::Loop { weight, .. } => *weight,
        }
    }
}

fn sequence_weight(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::weight).sum()
}

/// Group recognised instructions by loop. Comment bytes are dropped.
fn parse(code: &[u8]) -> Vec<Node> {
    let mut open_loops: Vec<(u32, Vec<Node>)> = Vec::new();
    let mut current = Vec::new();
    for (offset, &byte) in code.iter().enumerate() {
        let offset = offset as u32;
        match Instruction::decode(byte) {
            Some(Instruction::LoopStart) => {
                open_loops.push((offset, std::mem::take(&mut current)));
            }
            Some(Instruction::LoopEnd) => {
                // Balanced source: there is always an open loop here.
                if let Some((open, outer)) = open_loops.pop() {
                    let body = std::mem::replace(&mut current, outer);
                    current.push(Node::Loop {
                        open,
                        close: offset,
                        weight: 2 + sequence_weight(&body),
                        body,
                    });
                }
            }
            Some(instruction) => current.push(Node::Op(instruction, offset)),
            None => {}
        }
    }
    current
}

// ══════════════════════════════════════════════════════════════════════════════
// Outlining
// ══════════════════════════════════════════════════════════════════════════════

struct Lowerer<'a> {
    config: &'a MachineConfig,
    chunks: Vec<Function>,
}

impl Lowerer<'_> {
    fn emit_sequence(&mut self, f: &mut Function, nodes: &[Node]) {
        if sequence_weight(nodes) <= CHUNK_WEIGHT {
            for node in nodes {
                self.emit_node(f, node);
            }
            return;
        }

        let mut start = 0;
        let mut weight = 0;
        for (i, node) in nodes.iter().enumerate() {
            let w = node.weight();
            if w > CHUNK_WEIGHT {
                if start < i {
                    self.call_chunk(f, &nodes[start..i]);
                }
                self.call_chunk(f, std::slice::from_ref(node));
                start = i + 1;
                weight = 0;
            } else if weight + w > CHUNK_WEIGHT {
                self.call_chunk(f, &nodes[start..i]);
                start = i;
                weight = w;
            } else {
                weight += w;
            }
        }
        if start < nodes.len() {
            self.call_chunk(f, &nodes[start..]);
        }
    }

    fn emit_node(&mut self, f: &mut Function, node: &Node) {
        match node {
            Node::Op(instruction, offset) => {
                Emitter::new(f, self.config).lower(*instruction, *offset);
            }
            Node::Loop {
                open, close, body, ..
            } => {
                Emitter::new(f, self.config).loop_start(*open);
                self.emit_sequence(f, body);
                Emitter::new(f, self.config).loop_end(*close);
            }
        }
    }

    /// Outline `nodes` into a new chunk and call it from `f`.
    fn call_chunk(&mut self, f: &mut Function, nodes: &[Node]) {
        // Reserve the index first: nested chunks are numbered after this one.
        let index = self.chunks.len();
        self.chunks.push(Function::new(vec![]));

        let mut chunk = Function::new(vec![(1, ValType::I32)]);
        for node in nodes {
            self.emit_node(&mut chunk, node);
        }
        chunk.instruction(&Op::LocalGet(LOCAL_DP));
        chunk.instruction(&Op::End);
        self.chunks[index] = chunk;

        f.instruction(&Op::LocalGet(LOCAL_DP));
        f.instruction(&Op::Call(chunk_func_idx(index as u32)));
        f.instruction(&Op::LocalSet(LOCAL_DP));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instruction sequences
// ══════════════════════════════════════════════════════════════════════════════

struct Emitter<'a> {
    f: &'a mut Function,
    config: &'a MachineConfig,
}

impl<'a> Emitter<'a> {
    fn new(f: &'a mut Function, config: &'a MachineConfig) -> Self {
        Self { f, config }
    }

    /// Lower a non-bracket instruction.
    fn lower(&mut self, instruction: Instruction, offset: u32) {
        if instruction.touches_cell() {
            self.check_pointer(offset);
        }
        match instruction {
            Instruction::Right => self.move_right(),
            Instruction::Left => self.move_left(),
            Instruction::Increment => self.add_to_cell(Op::I32Add),
            Instruction::Decrement => self.add_to_cell(Op::I32Sub),
            Instruction::Output => {
                self.load_cell();
                self.op(Op::Call(rt_func_idx(RT_WRITE_BYTE)));
            }
            Instruction::Input => self.read_into_cell(),
            Instruction::LoopStart => self.loop_start_body(),
            Instruction::LoopEnd => self.loop_end_body(),
        }
    }

    fn loop_start(&mut self, offset: u32) {
        self.check_pointer(offset);
        self.loop_start_body();
    }

    fn loop_end(&mut self, offset: u32) {
        self.check_pointer(offset);
        self.loop_end_body();
    }

    fn loop_start_body(&mut self) {
        self.op(Op::Block(BlockType::Empty));
        self.load_cell();
        self.op(Op::I32Eqz);
        self.op(Op::BrIf(0));
        self.op(Op::Loop(BlockType::Empty));
    }

    fn loop_end_body(&mut self) {
        self.load_cell();
        self.op(Op::BrIf(0));
        self.op(Op::End);
        self.op(Op::End);
    }

    fn op(&mut self, op: Op<'_>) {
        self.f.instruction(&op);
    }

    fn tape_len(&self) -> i32 {
        self.config.tape_len as i32
    }

    /// Under the faulting policy, exit unless `0 <= dp < tape_len`. The
    /// unsigned comparison covers negative pointers.
    fn check_pointer(&mut self, offset: u32) {
        if self.config.pointer_policy != PointerPolicy::Fault {
            return;
        }
        self.op(Op::LocalGet(LOCAL_DP));
        self.op(Op::I32Const(self.tape_len()));
        self.op(Op::I32GeU);
        self.op(Op::If(BlockType::Empty));
        self.op(Op::I32Const(offset as i32));
        self.op(Op::Call(rt_func_idx(RT_POINTER_FAULT)));
        self.op(Op::Unreachable);
        self.op(Op::End);
    }

    fn move_right(&mut self) {
        self.op(Op::LocalGet(LOCAL_DP));
        self.op(Op::I32Const(1));
        self.op(Op::I32Add);
        match self.config.pointer_policy {
            PointerPolicy::Fault => self.op(Op::LocalSet(LOCAL_DP)),
            PointerPolicy::Wrap => {
                // dp = dp + 1 == len ? 0 : dp + 1
                self.op(Op::LocalTee(LOCAL_DP));
                self.op(Op::I32Const(self.tape_len()));
                self.op(Op::I32Eq);
                self.op(Op::If(BlockType::Empty));
                self.op(Op::I32Const(0));
                self.op(Op::LocalSet(LOCAL_DP));
                self.op(Op::End);
            }
        }
    }

    fn move_left(&mut self) {
        if self.config.pointer_policy == PointerPolicy::Wrap {
            // if dp == 0 { dp = len }
            self.op(Op::LocalGet(LOCAL_DP));
            self.op(Op::I32Eqz);
            self.op(Op::If(BlockType::Empty));
            self.op(Op::I32Const(self.tape_len()));
            self.op(Op::LocalSet(LOCAL_DP));
            self.op(Op::End);
        }
        self.op(Op::LocalGet(LOCAL_DP));
        self.op(Op::I32Const(1));
        self.op(Op::I32Sub);
        self.op(Op::LocalSet(LOCAL_DP));
    }

    /// Push the byte address of the current cell, relative to `TAPE_BASE`.
    fn cell_address(&mut self) {
        self.op(Op::LocalGet(LOCAL_DP));
        if self.config.cell_width == CellWidth::U16 {
            self.op(Op::I32Const(1));
            self.op(Op::I32Shl);
        }
    }

    fn load_cell(&mut self) {
        self.cell_address();
        let arg = memarg(TAPE_BASE as u64, 0);
        match self.config.cell_width {
            CellWidth::U8 => self.op(Op::I32Load8U(arg)),
            CellWidth::U16 => self.op(Op::I32Load16U(arg)),
        }
    }

    /// Store the value on top of the stack; the address must be below it.
    /// Narrow stores truncate, which is the cell wraparound.
    fn store_cell(&mut self) {
        let arg = memarg(TAPE_BASE as u64, 0);
        match self.config.cell_width {
            CellWidth::U8 => self.op(Op::I32Store8(arg)),
            CellWidth::U16 => self.op(Op::I32Store16(arg)),
        }
    }

    fn add_to_cell(&mut self, op: Op<'static>) {
        self.cell_address();
        self.load_cell();
        self.op(Op::I32Const(1));
        self.op(op);
        self.store_cell();
    }

    fn read_into_cell(&mut self) {
        self.op(Op::Call(rt_func_idx(RT_READ_BYTE)));
        self.op(Op::LocalTee(LOCAL_BYTE));
        self.op(Op::I32Const(-1));
        self.op(Op::I32Ne);
        self.op(Op::If(BlockType::Empty));
        self.cell_address();
        self.op(Op::LocalGet(LOCAL_BYTE));
        self.store_cell();
        let eof_value = match self.config.eof_policy {
            EofPolicy::Unchanged => None,
            EofPolicy::Zero => Some(0),
            EofPolicy::AllOnes => Some(-1),
        };
        if let Some(value) = eof_value {
            self.op(Op::Else);
            self.cell_address();
            self.op(Op::I32Const(value));
            self.store_cell();
        }
        self.op(Op::End);
    }
}
