//! Runtime helper functions emitted into the WASM module.
//!
//! Byte I/O over the WASI stream calls and the pointer-fault exit path.
//! Every function is registered during module assembly (in `compiler.rs`)
//! and referenced by its function index.

use wasm_encoder::{BlockType, Function, Instruction, MemArg, ValType};

use crate::types::*;

// ══════════════════════════════════════════════════════════════════════════════
// Function index offsets (relative to IMPORT_COUNT)
// ══════════════════════════════════════════════════════════════════════════════

/// Read one byte from stdin; `read_byte() -> i32`, `-1` at end of input.
pub const RT_READ_BYTE: u32 = 0;

/// Write the low byte of the argument to stdout; `write_byte(b: i32)`.
pub const RT_WRITE_BYTE: u32 = 1;

/// Report a data pointer fault and exit; `pointer_fault(offset: i32)`.
pub const RT_POINTER_FAULT: u32 = 2;

/// The generated program; `run()`.
pub const RT_RUN: u32 = 3;

/// WASI command entry point; `_start()`.
pub const RT_START: u32 = 4;

/// Number of fixed locally-defined functions. Chunks of `run` outlined by
/// the lowering follow them.
pub const RT_FUNC_COUNT: u32 = 5;

/// Compute the absolute WASM function index of a local function.
#[inline]
pub const fn rt_func_idx(rt_offset: u32) -> u32 {
    IMPORT_COUNT + rt_offset
}

/// Absolute function index of the `chunk`-th outlined chunk of `run`.
#[inline]
pub const fn chunk_func_idx(chunk: u32) -> u32 {
    rt_func_idx(RT_FUNC_COUNT + chunk)
}

// ══════════════════════════════════════════════════════════════════════════════
// Emit helpers: each builds a `wasm_encoder::Function`
// ══════════════════════════════════════════════════════════════════════════════

/// Emit `read_byte() -> i32`.
///
/// One `fd_read` of a single byte into `IO_BYTE`. Zero bytes read means end
/// of input. A non-zero errno exits with [`EXIT_IO_FAILURE`].
pub fn emit_read_byte() -> Function {
    let mut f = Function::new(vec![]);
    emit_single_byte_iovec(&mut f);

    // errno = fd_read(stdin, IOVEC, 1, NRESULT)
    f.instruction(&Instruction::I32Const(FD_STDIN));
    f.instruction(&Instruction::I32Const(IOVEC as i32));
    f.instruction(&Instruction::I32Const(1));
    f.instruction(&Instruction::I32Const(NRESULT as i32));
    f.instruction(&Instruction::Call(IMPORT_FD_READ));
    f.instruction(&Instruction::If(BlockType::Empty));
    emit_exit(&mut f, EXIT_IO_FAILURE);
    f.instruction(&Instruction::End);

    // nread == 0 ? -1 : IO_BYTE
    f.instruction(&Instruction::I32Const(NRESULT as i32));
    f.instruction(&Instruction::I32Load(memarg(0, 2)));
    f.instruction(&Instruction::I32Eqz);
    f.instruction(&Instruction::If(BlockType::Result(ValType::I32)));
    f.instruction(&Instruction::I32Const(-1));
    f.instruction(&Instruction::Else);
    f.instruction(&Instruction::I32Const(IO_BYTE as i32));
    f.instruction(&Instruction::I32Load8U(memarg(0, 0)));
    f.instruction(&Instruction::End);
    f.instruction(&Instruction::End);
    f
}

/// Emit `write_byte(b: i32)`.
///
/// Stores the low byte in `IO_BYTE` and writes it to stdout. A non-zero errno
/// or a write of zero bytes exits with [`EXIT_IO_FAILURE`].
pub fn emit_write_byte() -> Function {
    let mut f = Function::new(vec![]);
    f.instruction(&Instruction::I32Const(IO_BYTE as i32));
    f.instruction(&Instruction::LocalGet(0));
    f.instruction(&Instruction::I32Store8(memarg(0, 0)));
    emit_single_byte_iovec(&mut f);

    f.instruction(&Instruction::I32Const(FD_STDOUT));
    f.instruction(&Instruction::I32Const(IOVEC as i32));
    f.instruction(&Instruction::I32Const(1));
    f.instruction(&Instruction::I32Const(NRESULT as i32));
    f.instruction(&Instruction::Call(IMPORT_FD_WRITE));
    // errno != 0 || nwritten == 0
    f.instruction(&Instruction::I32Const(NRESULT as i32));
    f.instruction(&Instruction::I32Load(memarg(0, 2)));
    f.instruction(&Instruction::I32Eqz);
    f.instruction(&Instruction::I32Or);
    f.instruction(&Instruction::If(BlockType::Empty));
    emit_exit(&mut f, EXIT_IO_FAILURE);
    f.instruction(&Instruction::End);
    f.instruction(&Instruction::End);
    f
}

/// Emit `pointer_fault(offset: i32)`.
///
/// Writes `FAULT_MESSAGE`, the offset in decimal and a newline to stderr in
/// one gathered `fd_write`, then exits with [`EXIT_POINTER_FAULT`]. The offset
/// is treated as unsigned.
pub fn emit_pointer_fault() -> Function {
    // Locals: 0=offset (param), 1=cursor
    let mut f = Function::new(vec![(1, ValType::I32)]);

    // cursor = DIGITS_END
    f.instruction(&Instruction::I32Const(DIGITS_END as i32));
    f.instruction(&Instruction::LocalSet(1));

    // do { *--cursor = '0' + offset % 10; offset /= 10 } while offset != 0
    f.instruction(&Instruction::Loop(BlockType::Empty));
    f.instruction(&Instruction::LocalGet(1));
    f.instruction(&Instruction::I32Const(1));
    f.instruction(&Instruction::I32Sub);
    f.instruction(&Instruction::LocalTee(1));
    f.instruction(&Instruction::LocalGet(0));
    f.instruction(&Instruction::I32Const(10));
    f.instruction(&Instruction::I32RemU);
    f.instruction(&Instruction::I32Const(b'0' as i32));
    f.instruction(&Instruction::I32Add);
    f.instruction(&Instruction::I32Store8(memarg(0, 0)));
    f.instruction(&Instruction::LocalGet(0));
    f.instruction(&Instruction::I32Const(10));
    f.instruction(&Instruction::I32DivU);
    f.instruction(&Instruction::LocalTee(0));
    f.instruction(&Instruction::BrIf(0));
    f.instruction(&Instruction::End);

    // iovs[0] = {MESSAGE, len}
    f.instruction(&Instruction::I32Const(FAULT_IOVS as i32));
    f.instruction(&Instruction::I32Const(MESSAGE as i32));
    f.instruction(&Instruction::I32Store(memarg(0, 2)));
    f.instruction(&Instruction::I32Const(FAULT_IOVS as i32));
    f.instruction(&Instruction::I32Const(FAULT_MESSAGE.len() as i32));
    f.instruction(&Instruction::I32Store(memarg(4, 2)));

    // iovs[1] = {cursor, DIGITS_END + 1 - cursor}
    f.instruction(&Instruction::I32Const(FAULT_IOVS as i32));
    f.instruction(&Instruction::LocalGet(1));
    f.instruction(&Instruction::I32Store(memarg(8, 2)));
    f.instruction(&Instruction::I32Const(FAULT_IOVS as i32));
    f.instruction(&Instruction::I32Const(DIGITS_END as i32 + 1));
    f.instruction(&Instruction::LocalGet(1));
    f.instruction(&Instruction::I32Sub);
    f.instruction(&Instruction::I32Store(memarg(12, 2)));

    // Best effort: the exit status carries the fault either way.
    f.instruction(&Instruction::I32Const(FD_STDERR));
    f.instruction(&Instruction::I32Const(FAULT_IOVS as i32));
    f.instruction(&Instruction::I32Const(2));
    f.instruction(&Instruction::I32Const(NRESULT as i32));
    f.instruction(&Instruction::Call(IMPORT_FD_WRITE));
    f.instruction(&Instruction::Drop);

    emit_exit(&mut f, EXIT_POINTER_FAULT);
    f.instruction(&Instruction::End);
    f
}

/// Emit `_start()`: run the program and return, which exits with status 0.
pub fn emit_start() -> Function {
    let mut f = Function::new(vec![]);
    f.instruction(&Instruction::Call(rt_func_idx(RT_RUN)));
    f.instruction(&Instruction::End);
    f
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// `IOVEC = {IO_BYTE, 1}`
fn emit_single_byte_iovec(f: &mut Function) {
    f.instruction(&Instruction::I32Const(IOVEC as i32));
    f.instruction(&Instruction::I32Const(IO_BYTE as i32));
    f.instruction(&Instruction::I32Store(memarg(0, 2)));
    f.instruction(&Instruction::I32Const(IOVEC as i32));
    f.instruction(&Instruction::I32Const(1));
    f.instruction(&Instruction::I32Store(memarg(4, 2)));
}

/// `proc_exit(code); unreachable`
fn emit_exit(f: &mut Function, code: i32) {
    f.instruction(&Instruction::I32Const(code));
    f.instruction(&Instruction::Call(IMPORT_PROC_EXIT));
    f.instruction(&Instruction::Unreachable);
}

/// Create a `MemArg` with the given offset and alignment power.
pub(crate) fn memarg(offset: u64, align: u32) -> MemArg {
    MemArg {
        offset,
        align,
        memory_index: 0,
    }
}
