//! Module layout constants: type, import and function indices, memory map.
//!
//! Linear memory:
//!
//! ```text
//! 0     IOVEC        one iovec {buf, len} for single-byte reads and writes
//! 8     NRESULT      bytes read / written by the last call
//! 12    IO_BYTE      the byte being transferred
//! 16    FAULT_IOVS   two iovecs: message text, then position digits
//! 32    DIGITS       decimal digits of the fault position, written backwards
//! 52    DIGITS_END   '\n' (data segment)
//! 64    MESSAGE      fault message text (data segment)
//! 4096  TAPE_BASE    tape_len cells of 1 or 2 bytes each
//! ```

// ── WASM type indices ────────────────────────────────────────────────────────
// Fixed type indices in the type section (see compiler.rs emit_types).

/// `() -> ()`
pub const TYPE_VOID_VOID: u32 = 0;
/// `(i32) -> ()`
pub const TYPE_I32_VOID: u32 = 1;
/// `() -> i32`
pub const TYPE_VOID_I32: u32 = 2;
/// `(i32, i32, i32, i32) -> i32`
pub const TYPE_I32X4_I32: u32 = 3;
/// `(i32) -> i32`
pub const TYPE_I32_I32: u32 = 4;

// ── Imported function indices ────────────────────────────────────────────────
// (order must match the import section emission in compiler.rs)

pub const WASI_MODULE: &str = "wasi_snapshot_preview1";

/// `fd_read(fd, iovs, iovs_len, nread) -> errno`
pub const IMPORT_FD_READ: u32 = 0;
/// `fd_write(fd, iovs, iovs_len, nwritten) -> errno`
pub const IMPORT_FD_WRITE: u32 = 1;
/// `proc_exit(code)`; never returns.
pub const IMPORT_PROC_EXIT: u32 = 2;

/// Number of imported functions (offset for locally-defined function indices).
pub const IMPORT_COUNT: u32 = 3;

pub const FD_STDIN: i32 = 0;
pub const FD_STDOUT: i32 = 1;
pub const FD_STDERR: i32 = 2;

// ── Exit status ──────────────────────────────────────────────────────────────

/// The data pointer touched a cell outside the tape.
pub const EXIT_POINTER_FAULT: i32 = 70;
/// A read or write on a standard stream failed.
pub const EXIT_IO_FAILURE: i32 = 74;

// ── Memory ───────────────────────────────────────────────────────────────────

pub const IOVEC: u32 = 0;
pub const NRESULT: u32 = 8;
pub const IO_BYTE: u32 = 12;
pub const FAULT_IOVS: u32 = 16;
pub const DIGITS: u32 = 32;
/// One past the last digit; holds the trailing newline.
pub const DIGITS_END: u32 = 52;
pub const MESSAGE: u32 = 64;
pub const TAPE_BASE: u32 = 4096;

pub const PAGE_SIZE: u64 = 65_536;

/// Written to standard error, followed by the offset and a newline, when the
/// data pointer faults.
pub const FAULT_MESSAGE: &[u8] = b"data pointer out of bounds at offset ";

/// Linear memory pages needed for a tape of `tape_bytes` bytes.
pub fn memory_pages(tape_bytes: u64) -> u64 {
    (TAPE_BASE as u64 + tape_bytes).div_ceil(PAGE_SIZE)
}

// ── Custom sections ──────────────────────────────────────────────────────────

/// Raw source text of the compiled program.
pub const SOURCE_SECTION_NAME: &str = "bf.source";
/// JSON-encoded [`crate::ArtifactMetadata`].
pub const META_SECTION_NAME: &str = "bf.meta";
/// Compiler version embedded in the metadata.
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");
