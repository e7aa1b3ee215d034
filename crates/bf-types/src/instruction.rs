//! The eight machine instructions.

use std::fmt;

/// A decoded instruction byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `>`: move the data pointer right.
    Right,
    /// `<`: move the data pointer left.
    Left,
    /// `+`: increment the current cell.
    Increment,
    /// `-`: decrement the current cell.
    Decrement,
    /// `.`: write the current cell to the output.
    Output,
    /// `,`: read one byte into the current cell.
    Input,
    /// `[`: skip past the matching `]` if the current cell is zero.
    LoopStart,
    /// `]`: return past the matching `[` if the current cell is non-zero.
    LoopEnd,
}

impl Instruction {
    /// Decode a source byte. Any byte that is not an instruction is a no-op
    /// and decodes to `None`.
    pub fn decode(byte: u8) -> Option<Self> {
        Some(match byte {
            b'>' => Self::Right,
            b'<' => Self::Left,
            b'+' => Self::Increment,
            b'-' => Self::Decrement,
            b'.' => Self::Output,
            b',' => Self::Input,
            b'[' => Self::LoopStart,
            b']' => Self::LoopEnd,
            _ => return None,
        })
    }

    /// The source byte for this instruction.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Right => b'>',
            Self::Left => b'<',
            Self::Increment => b'+',
            Self::Decrement => b'-',
            Self::Output => b'.',
            Self::Input => b',',
            Self::LoopStart => b'[',
            Self::LoopEnd => b']',
        }
    }

    /// Whether executing this instruction reads or writes the current cell.
    pub fn touches_cell(self) -> bool {
        !matches!(self, Self::Right | Self::Left)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}
