use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dcpu_emu_errors::ExecutorError;
use dcpu_emu_mem::phys::SharedMemory;
use dcpu_emu_regs::Regs;

use parking_lot::Mutex;

use crate::cpu::Cpu;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Target time between ticks. Zero runs unpaced.
    pub tick_interval: Duration,
    /// Pause instead of continuing past an unimplemented instruction
    pub halt_on_unimplemented: bool,
}

impl ExecutorConfig {
    pub const DEFAULT_TICK_RATE: u32 = 1000;

    pub fn with_tick_rate(hz: u32) -> Self {
        Self {
            tick_interval: Duration::from_secs(1) / hz.max(1),
            ..Self::default()
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1) / Self::DEFAULT_TICK_RATE,
            halt_on_unimplemented: false,
        }
    }
}

struct Shared {
    cpu: Mutex<Cpu>,
    paused: AtomicBool,
    shutdown: AtomicBool,
    ticks: AtomicU64,
}

/// Drives a [`Cpu`] from a dedicated thread.
///
/// The executor starts paused. Pausing takes effect between ticks: a tick in flight always
/// completes first.
pub struct CpuExecutor {
    shared: Arc<Shared>,
    memory: Arc<SharedMemory>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for CpuExecutor {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(th) = self.thread.take() {
            th.thread().unpark(); // In case the thread is parked while paused
            let _ = th.join();
        }
    }
}

fn run_loop(shared: &Shared, config: ExecutorConfig) {
    let mut deadline = Instant::now();
    let mut reported = false;

    while !shared.shutdown.load(Ordering::Acquire) {
        if shared.paused.load(Ordering::Acquire) {
            thread::park();
            deadline = Instant::now();
            continue;
        }

        let res = {
            let mut cpu = shared.cpu.lock();
            // A stop or load may have landed while waiting for the lock
            if shared.paused.load(Ordering::Acquire) || shared.shutdown.load(Ordering::Acquire) {
                continue;
            }
            let res = cpu.tick();
            shared.ticks.fetch_add(1, Ordering::Relaxed);
            res
        };

        if let Err(e) = res {
            if reported {
                tracing::debug!(%e, "instruction ignored");
            } else {
                tracing::warn!(%e, "instruction ignored");
                reported = true;
            }

            if config.halt_on_unimplemented {
                shared.paused.store(true, Ordering::Release);
                tracing::info!(address = e.address(), "halted on unimplemented instruction");
                continue;
            }
        }

        deadline += config.tick_interval;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            // Running behind; don't try to catch up with a burst of ticks
            deadline = now;
        }
    }

    tracing::debug!("tick thread exiting");
}

impl CpuExecutor {
    pub fn new(cpu: Cpu, config: ExecutorConfig) -> io::Result<Self> {
        let memory = cpu.memory().clone();

        let shared = Arc::new(Shared {
            cpu: Mutex::new(cpu),
            paused: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
        });

        let thread = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("dcpu-tick".into())
                .spawn(move || run_loop(&shared, config))?
        };

        Ok(Self {
            shared,
            memory,
            thread: Some(thread),
        })
    }

    fn wake(&self) {
        if let Some(th) = &self.thread {
            th.thread().unpark();
        }
    }

    pub fn start(&self) {
        self.shared.paused.store(false, Ordering::Release);
        self.wake();
        tracing::info!("started");
    }

    pub fn stop(&self) {
        self.shared.paused.store(true, Ordering::Release);
        tracing::info!("stopped");
    }

    /// Flips between running and paused, returning whether the executor is now paused
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.shared.paused.fetch_xor(true, Ordering::AcqRel);
        if !paused {
            self.wake();
        }
        tracing::info!(paused, "pause toggled");
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Replaces memory with `image`. Only allowed while paused.
    pub fn load_program(&self, image: &[u16]) -> Result<(), ExecutorError> {
        if !self.is_paused() {
            return Err(ExecutorError::Running);
        }

        // Holding the CPU excludes ticks for the duration of the load
        let _cpu = self.shared.cpu.lock();
        if !self.is_paused() {
            return Err(ExecutorError::Running);
        }

        self.memory.load_image(image)?;
        tracing::info!(len = image.len(), "program loaded");
        Ok(())
    }

    /// Clears the registers and any pending skip. Only allowed while paused.
    pub fn reset(&self) -> Result<(), ExecutorError> {
        if !self.is_paused() {
            return Err(ExecutorError::Running);
        }
        self.shared.cpu.lock().reset();
        Ok(())
    }

    /// A snapshot of the register file, taken between ticks
    pub fn registers(&self) -> Regs {
        *self.shared.cpu.lock().regs()
    }

    /// Number of ticks executed so far, skipped instructions included
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    pub fn memory(&self) -> &Arc<SharedMemory> {
        &self.memory
    }
}
