//! Tape machine interpreter: reference implementation.
//!
//! Executes programs directly from the source buffer. Used as the golden
//! reference the compiled artifacts are checked against.

mod error;
mod interpreter;
mod io;
mod machine;
mod tape;

pub use error::{EvalError, EvalResult};
pub use interpreter::{interpret, BracketStrategy, Interpreter, RunStats};
pub use io::{ByteInput, ByteOutput, ReadInput, WriteOutput};
pub use machine::{Machine, State};
pub use tape::Tape;
