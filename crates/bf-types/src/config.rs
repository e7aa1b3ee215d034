//! Machine configuration shared by the interpreter and the code generator.
//!
//! Every semantic choice the two backends must agree on lives here, so an
//! artifact and an interpretation run with the same [`MachineConfig`] are
//! observably identical.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of cells on the tape.
pub const DEFAULT_TAPE_LEN: u32 = 30_000;

/// Largest supported tape (16 Mi cells).
pub const MAX_TAPE_LEN: u32 = 16 * 1024 * 1024;

/// Width of a tape cell. Arithmetic wraps modulo `2^bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellWidth {
    U8,
    U16,
}

impl CellWidth {
    /// Bytes occupied by one cell.
    pub fn bytes(self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }

    /// Largest value a cell can hold; also the mask applied after arithmetic.
    pub fn max_value(self) -> u16 {
        match self {
            Self::U8 => u8::MAX as u16,
            Self::U16 => u16::MAX,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() * 8
    }
}

/// What happens when the data pointer leaves `[0, tape_len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPolicy {
    /// `>` on the last cell moves to cell 0, `<` on cell 0 moves to the last.
    Wrap,
    /// The pointer moves freely; touching a cell outside the tape faults.
    Fault,
}

/// Effect of `,` when the input stream is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EofPolicy {
    /// Leave the current cell as it is.
    Unchanged,
    /// Store 0.
    Zero,
    /// Store the cell's maximum value (a `-1` read truncated to the width).
    AllOnes,
}

/// Semantic configuration of the tape machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub tape_len: u32,
    pub cell_width: CellWidth,
    pub pointer_policy: PointerPolicy,
    pub eof_policy: EofPolicy,
}

impl MachineConfig {
    /// The reference machine: 16-bit cells, faulting pointer, all-ones at
    /// end of input.
    pub fn reference() -> Self {
        Self {
            tape_len: DEFAULT_TAPE_LEN,
            cell_width: CellWidth::U16,
            pointer_policy: PointerPolicy::Fault,
            eof_policy: EofPolicy::AllOnes,
        }
    }

    /// The common dialect: 8-bit cells, wrapping pointer, input left
    /// unchanged at end of input.
    pub fn canonical() -> Self {
        Self {
            tape_len: DEFAULT_TAPE_LEN,
            cell_width: CellWidth::U8,
            pointer_policy: PointerPolicy::Wrap,
            eof_policy: EofPolicy::Unchanged,
        }
    }

    pub fn with_tape_len(mut self, tape_len: u32) -> Self {
        self.tape_len = tape_len;
        self
    }

    pub fn with_cell_width(mut self, cell_width: CellWidth) -> Self {
        self.cell_width = cell_width;
        self
    }

    pub fn with_pointer_policy(mut self, pointer_policy: PointerPolicy) -> Self {
        self.pointer_policy = pointer_policy;
        self
    }

    pub fn with_eof_policy(mut self, eof_policy: EofPolicy) -> Self {
        self.eof_policy = eof_policy;
        self
    }

    /// Check the configuration describes a machine both backends can build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tape_len == 0 {
            return Err(ConfigError::EmptyTape);
        }
        if self.tape_len > MAX_TAPE_LEN {
            return Err(ConfigError::TapeTooLarge {
                requested: self.tape_len,
                max: MAX_TAPE_LEN,
            });
        }
        Ok(())
    }

    /// Tape size in bytes.
    pub fn tape_bytes(&self) -> u64 {
        self.tape_len as u64 * self.cell_width.bytes() as u64
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// reference values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        // A struct of plain enums and integers always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self::reference()
    }
}
