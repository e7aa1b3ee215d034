//! In-process execution of generated artifacts under `wasmi`.
//!
//! The runner links the three WASI preview-1 calls an artifact imports
//! against injected byte streams, so artifacts can be run and compared with
//! the interpreter without touching process stdio. Standard error is
//! captured in the [`RunReport`].

use bf_codegen::types::{EXIT_IO_FAILURE, WASI_MODULE};
use bf_eval::{ByteInput, ByteOutput};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use wasmi::core::TrapCode;
use wasmi::{Caller, Config, Engine, Extern, Linker, Memory, Module, Store};

use crate::error::RunError;

// WASI errno values returned to the module.
const ERRNO_SUCCESS: i32 = 0;
const ERRNO_BADF: i32 = 8;
const ERRNO_FAULT: i32 = 21;
const ERRNO_IO: i32 = 29;

/// Runner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Bound execution to this much `wasmi` fuel. `None` runs unbounded.
    pub fuel: Option<u64>,
}

impl RunnerConfig {
    pub fn with_fuel(fuel: u64) -> Self {
        Self { fuel: Some(fuel) }
    }
}

/// Result of an artifact run that reached an exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport<O> {
    /// Process exit status: 0 on success.
    pub exit_code: i32,
    /// Everything written to fd 2.
    pub stderr: Vec<u8>,
    /// The output sink, handed back after the run.
    pub output: O,
}

impl<O> RunReport<O> {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Store data for one run.
struct HostState<I, O> {
    input: I,
    output: O,
    stderr: Vec<u8>,
}

/// Run `wasm` with default settings.
///
/// The streams are moved into the engine's store for the duration of the run,
/// which requires them to be `'static`: pass owned values such as `&'static
/// [u8]`, `Vec<u8>` or [`bf_eval::ReadInput`] rather than `&mut` borrows. The
/// output sink is handed back in [`RunReport::output`].
pub fn run_artifact<I, O>(wasm: &[u8], input: I, output: O) -> Result<RunReport<O>, RunError>
where
    I: ByteInput + 'static,
    O: ByteOutput + 'static,
{
    ArtifactRunner::new(RunnerConfig::default()).run(wasm, input, output)
}

/// Executes artifacts. One engine is shared by every run.
#[derive(Debug)]
pub struct ArtifactRunner {
    engine: Engine,
    config: RunnerConfig,
}

impl ArtifactRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let mut wasmi_config = Config::default();
        if config.fuel.is_some() {
            wasmi_config.consume_fuel(true);
        }
        Self {
            engine: Engine::new(&wasmi_config),
            config,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Instantiate `wasm` and call its `_start` export.
    ///
    /// The output sink is flushed once the module exits; a failed flush turns
    /// a successful exit into [`EXIT_IO_FAILURE`]. Both streams must be
    /// `'static`, as for [`run_artifact`].
    #[instrument(skip_all, fields(bytes = wasm.len()))]
    pub fn run<I, O>(&self, wasm: &[u8], input: I, output: O) -> Result<RunReport<O>, RunError>
    where
        I: ByteInput + 'static,
        O: ByteOutput + 'static,
    {
        let module = Module::new(&self.engine, wasm).map_err(RunError::Load)?;
        let host = HostState {
            input,
            output,
            stderr: Vec::new(),
        };
        let mut store = Store::new(&self.engine, host);
        if let Some(fuel) = self.config.fuel {
            store.set_fuel(fuel).map_err(RunError::Instantiate)?;
        }

        let mut linker = Linker::<HostState<I, O>>::new(&self.engine);
        link_wasi(&mut linker).map_err(RunError::Instantiate)?;
        let instance = linker
            .instantiate(&mut store, &module)
            .and_then(|pre| pre.start(&mut store))
            .map_err(RunError::Instantiate)?;
        let start = instance
            .get_typed_func::<(), ()>(&store, "_start")
            .map_err(|_| RunError::MissingExport("_start"))?;

        let mut exit_code = match start.call(&mut store, ()) {
            Ok(()) => 0,
            Err(err) => match err.i32_exit_status() {
                Some(code) => code,
                None if err.as_trap_code() == Some(TrapCode::OutOfFuel) => {
                    return Err(RunError::OutOfFuel)
                }
                None => return Err(RunError::Trap(err)),
            },
        };

        let mut host = store.into_data();
        if let Err(err) = host.output.flush() {
            debug!(error = %err, "flushing output failed");
            if exit_code == 0 {
                exit_code = EXIT_IO_FAILURE;
            }
        }
        debug!(exit_code, stderr_bytes = host.stderr.len(), "artifact exited");
        Ok(RunReport {
            exit_code,
            stderr: host.stderr,
            output: host.output,
        })
    }
}

fn link_wasi<I, O>(linker: &mut Linker<HostState<I, O>>) -> Result<(), wasmi::Error>
where
    I: ByteInput + 'static,
    O: ByteOutput + 'static,
{
    linker.func_wrap(
        WASI_MODULE,
        "fd_read",
        |mut caller: Caller<'_, HostState<I, O>>, fd: i32, iovs: i32, iovs_len: i32, nread: i32| {
            if fd != 0 {
                return ERRNO_BADF;
            }
            let Some(memory) = exported_memory(&caller) else {
                return ERRNO_FAULT;
            };
            let (data, host) = memory.data_and_store_mut(&mut caller);
            let mut total = 0u32;
            'iovecs: for i in 0..iovs_len.max(0) as u32 {
                let Some((buf, len)) = read_iovec(data, (iovs as u32).wrapping_add(i * 8)) else {
                    return ERRNO_FAULT;
                };
                for at in buf..buf + len {
                    match host.input.read_byte() {
                        Ok(Some(byte)) => {
                            let Some(slot) = data.get_mut(at as usize) else {
                                return ERRNO_FAULT;
                            };
                            *slot = byte;
                            total += 1;
                        }
                        Ok(None) => break 'iovecs,
                        Err(err) => {
                            debug!(error = %err, "input stream failed");
                            return ERRNO_IO;
                        }
                    }
                }
            }
            write_u32(data, nread as u32, total)
        },
    )?;

    linker.func_wrap(
        WASI_MODULE,
        "fd_write",
        |mut caller: Caller<'_, HostState<I, O>>, fd: i32, iovs: i32, iovs_len: i32, nwritten: i32| {
            if fd != 1 && fd != 2 {
                return ERRNO_BADF;
            }
            let Some(memory) = exported_memory(&caller) else {
                return ERRNO_FAULT;
            };
            let (data, host) = memory.data_and_store_mut(&mut caller);
            let mut total = 0u32;
            for i in 0..iovs_len.max(0) as u32 {
                let Some((buf, len)) = read_iovec(data, (iovs as u32).wrapping_add(i * 8)) else {
                    return ERRNO_FAULT;
                };
                let Some(bytes) = data.get(buf as usize..(buf + len) as usize) else {
                    return ERRNO_FAULT;
                };
                if fd == 2 {
                    host.stderr.extend_from_slice(bytes);
                } else {
                    for &byte in bytes {
                        if let Err(err) = host.output.write_byte(byte) {
                            debug!(error = %err, "output stream failed");
                            return ERRNO_IO;
                        }
                    }
                }
                total += len;
            }
            write_u32(data, nwritten as u32, total)
        },
    )?;

    linker.func_wrap(
        WASI_MODULE,
        "proc_exit",
        |_: Caller<'_, HostState<I, O>>, code: i32| -> Result<(), wasmi::Error> {
            Err(wasmi::Error::i32_exit(code))
        },
    )?;

    Ok(())
}

fn exported_memory<T>(caller: &Caller<'_, T>) -> Option<Memory> {
    caller.get_export("memory").and_then(Extern::into_memory)
}

fn read_u32(data: &[u8], at: u32) -> Option<u32> {
    let at = at as usize;
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// `(buf, len)` of the iovec at `at`, if the whole buffer lies in memory.
fn read_iovec(data: &[u8], at: u32) -> Option<(u32, u32)> {
    let buf = read_u32(data, at)?;
    let len = read_u32(data, at.checked_add(4)?)?;
    let end = buf.checked_add(len)?;
    (end as usize <= data.len()).then_some((buf, len))
}

/// Store a result word; returns the errno for the call.
fn write_u32(data: &mut [u8], at: u32, value: u32) -> i32 {
    let at = at as usize;
    match data.get_mut(at..at.saturating_add(4)) {
        Some(slot) if slot.len() == 4 => {
            slot.copy_from_slice(&value.to_le_bytes());
            ERRNO_SUCCESS
        }
        _ => ERRNO_FAULT,
    }
}
