//! Run-to-completion driver over [`Machine`].

use bf_resolver::BracketMap;
use bf_types::{MachineConfig, SourceBuffer};
use tracing::{debug, instrument};

use crate::error::{EvalError, EvalResult};
use crate::io::{ByteInput, ByteOutput};
use crate::machine::{Machine, Partners, State};

/// How bracket partners are found during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BracketStrategy {
    /// Pair every bracket once before running; unbalanced source is rejected
    /// before any instruction executes.
    #[default]
    Precomputed,
    /// Scan for the partner each time a bracket executes.
    OnDemand,
}

/// Counters reported by a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub steps: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Interprets one source buffer under one configuration.
///
/// The interpreter is immutable; every [`Interpreter::run`] gets a fresh
/// zeroed tape.
#[derive(Debug)]
pub struct Interpreter<'s> {
    source: &'s SourceBuffer,
    config: MachineConfig,
    map: Option<BracketMap>,
}

impl<'s> Interpreter<'s> {
    pub fn new(source: &'s SourceBuffer, config: MachineConfig) -> EvalResult<Self> {
        Self::with_strategy(source, config, BracketStrategy::Precomputed)
    }

    pub fn with_strategy(
        source: &'s SourceBuffer,
        config: MachineConfig,
        strategy: BracketStrategy,
    ) -> EvalResult<Self> {
        config.validate()?;
        let map = match strategy {
            BracketStrategy::Precomputed => Some(BracketMap::build(source.bytes())?),
            BracketStrategy::OnDemand => None,
        };
        Ok(Self {
            source,
            config,
            map,
        })
    }

    pub fn strategy(&self) -> BracketStrategy {
        match self.map {
            Some(_) => BracketStrategy::Precomputed,
            None => BracketStrategy::OnDemand,
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// A machine at the initial state, for stepping by hand.
    pub fn machine(&self) -> Machine<'_> {
        let partners = match &self.map {
            Some(map) => Partners::Table(map),
            None => Partners::Scan,
        };
        Machine::new(self.source.bytes(), partners, self.config)
    }

    /// Run until the instruction pointer leaves the source.
    ///
    /// Output is flushed when the run ends, whether it halted or failed.
    /// There is no step limit: a program that never halts never returns. To
    /// bound a run, drive [`Interpreter::machine`] step by step instead.
    #[instrument(skip_all, fields(source = %self.source.name()))]
    pub fn run<I, O>(&self, mut input: I, mut output: O) -> EvalResult<RunStats>
    where
        I: ByteInput,
        O: ByteOutput,
    {
        let mut machine = self.machine();
        let result = run_to_halt(&mut machine, &mut input, &mut output);
        let flushed = output.flush();

        if let Err(err) = &result {
            debug!(code = %err.code(), ip = machine.ip(), "run failed");
        }
        result?;
        flushed.map_err(|source| EvalError::OutputFailed {
            offset: self.source.len(),
            source,
        })?;

        let stats = RunStats {
            steps: machine.steps(),
            bytes_read: machine.bytes_read(),
            bytes_written: machine.bytes_written(),
        };
        debug!(
            steps = stats.steps,
            bytes_read = stats.bytes_read,
            bytes_written = stats.bytes_written,
            "program halted"
        );
        Ok(stats)
    }
}

fn run_to_halt<I, O>(machine: &mut Machine<'_>, input: &mut I, output: &mut O) -> EvalResult<()>
where
    I: ByteInput,
    O: ByteOutput,
{
    while let State::Running { .. } = machine.step(input, output)? {}
    Ok(())
}

/// Interpret `source` with the precomputed bracket strategy.
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
    Interpreter::new(source, config)?.run(input, output)
}
