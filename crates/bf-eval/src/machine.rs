//! The tape machine: one transition per call to [`Machine::step`].

use bf_resolver::{scan_partner, BracketMap};
use bf_types::{Bracket, BracketError, EofPolicy, Instruction, MachineConfig, PointerPolicy};

use crate::error::{EvalError, EvalResult};
use crate::io::{ByteInput, ByteOutput};
use crate::tape::Tape;

/// Observable control state after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running { ip: usize, dp: i32 },
    Halted,
}

/// How a machine finds the partner of a bracket.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Partners<'a> {
    Table(&'a BracketMap),
    Scan,
}

/// Execution state of one run: tape, pointers and counters.
///
/// A machine is created fresh for every run and never reused.
#[derive(Debug)]
pub struct Machine<'a> {
    code: &'a [u8],
    partners: Partners<'a>,
    config: MachineConfig,
    tape: Tape,
    ip: usize,
    dp: i32,
    steps: u64,
    bytes_read: u64,
    bytes_written: u64,
}

impl<'a> Machine<'a> {
    pub(crate) fn new(code: &'a [u8], partners: Partners<'a>, config: MachineConfig) -> Self {
        Self {
            code,
            partners,
            config,
            tape: Tape::new(config.tape_len as usize, config.cell_width),
            ip: 0,
            dp: 0,
            steps: 0,
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    pub fn state(&self) -> State {
        if self.ip < self.code.len() {
            State::Running {
                ip: self.ip,
                dp: self.dp,
            }
        } else {
            State::Halted
        }
    }

    /// Dispatch the byte at the instruction pointer and advance.
    ///
    /// Stepping a halted machine is a no-op that returns [`State::Halted`].
    pub fn step<I, O>(&mut self, input: &mut I, output: &mut O) -> EvalResult<State>
    where
        I: ByteInput + ?Sized,
        O: ByteOutput + ?Sized,
    {
        let Some(&byte) = self.code.get(self.ip) else {
            return Ok(State::Halted);
        };
        let Some(instruction) = Instruction::decode(byte) else {
            self.ip += 1;
            return Ok(self.state());
        };
        self.steps += 1;

        match instruction {
            Instruction::Right => self.move_right(),
            Instruction::Left => self.move_left(),
            Instruction::Increment => {
                let cell = self.cell()?;
                self.tape.increment(cell);
            }
            Instruction::Decrement => {
                let cell = self.cell()?;
                self.tape.decrement(cell);
            }
            Instruction::Output => {
                let cell = self.cell()?;
                let byte = self.tape.get(cell) as u8;
                output
                    .write_byte(byte)
                    .map_err(|source| EvalError::OutputFailed {
                        offset: self.ip,
                        source,
                    })?;
                self.bytes_written += 1;
            }
            Instruction::Input => {
                let cell = self.cell()?;
                let read = input.read_byte().map_err(|source| EvalError::InputFailed {
                    offset: self.ip,
                    source,
                })?;
                match read {
                    Some(byte) => {
                        self.tape.set(cell, byte as u16);
                        self.bytes_read += 1;
                    }
                    None => match self.config.eof_policy {
                        EofPolicy::Unchanged => {}
                        EofPolicy::Zero => self.tape.set(cell, 0),
                        EofPolicy::AllOnes => self.tape.set(cell, u16::MAX),
                    },
                }
            }
            Instruction::LoopStart => {
                let cell = self.cell()?;
                let partner = self.partner(Bracket::Open)?;
                if self.tape.get(cell) == 0 {
                    self.ip = partner + 1;
                    return Ok(self.state());
                }
            }
            Instruction::LoopEnd => {
                let cell = self.cell()?;
                let partner = self.partner(Bracket::Close)?;
                if self.tape.get(cell) != 0 {
                    self.ip = partner + 1;
                    return Ok(self.state());
                }
            }
        }

        self.ip += 1;
        Ok(self.state())
    }

    fn move_right(&mut self) {
        self.dp = match self.config.pointer_policy {
            PointerPolicy::Wrap if self.dp as i64 + 1 >= self.tape.len() as i64 => 0,
            PointerPolicy::Wrap => self.dp + 1,
            PointerPolicy::Fault => self.dp.wrapping_add(1),
        };
    }

    fn move_left(&mut self) {
        self.dp = match self.config.pointer_policy {
            PointerPolicy::Wrap if self.dp <= 0 => self.tape.len() as i32 - 1,
            PointerPolicy::Wrap => self.dp - 1,
            PointerPolicy::Fault => self.dp.wrapping_sub(1),
        };
    }

    /// Index of the current cell, or a fault when the pointer is off the tape.
    fn cell(&self) -> EvalResult<usize> {
        match usize::try_from(self.dp) {
            Ok(index) if index < self.tape.len() => Ok(index),
            _ => Err(EvalError::PointerOutOfBounds {
                offset: self.ip,
                pointer: self.dp,
            }),
        }
    }

    fn partner(&self, bracket: Bracket) -> EvalResult<usize> {
        let partner = match self.partners {
            Partners::Table(map) => map.partner(self.ip),
            Partners::Scan => scan_partner(self.code, self.ip)?,
        };
        partner.ok_or_else(|| EvalError::UnmatchedBracket(BracketError::new(bracket, self.ip)))
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn dp(&self) -> i32 {
        self.dp
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Instructions executed so far (comment bytes are not counted).
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
