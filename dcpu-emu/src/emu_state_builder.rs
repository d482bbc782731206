use std::{io, path::PathBuf, sync::Arc, time::Duration};

use dcpu_emu_cpu::{
    cpu::Cpu,
    executor::{CpuExecutor, ExecutorConfig},
};
use dcpu_emu_mem::phys::SharedMemory;

use crate::loader::load_image_file;

#[derive(Default)]
pub struct EmuStateBuilder {
    image_path: Option<PathBuf>,
    tick_rate: Option<u32>,
    steps: Option<u64>,
    duration: Option<Duration>,
    screen: bool,
    halt_on_unimplemented: bool,
    log_filter: Option<String>,
}

impl EmuStateBuilder {
    pub fn image(&mut self, path: PathBuf) {
        self.image_path = Some(path);
    }

    pub fn tick_rate(&mut self, hz: u32) -> io::Result<()> {
        if hz == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "--tick-rate must be at least 1",
            ));
        }
        self.tick_rate = Some(hz);
        Ok(())
    }

    pub fn steps(&mut self, steps: u64) {
        self.steps = Some(steps);
    }

    pub fn duration(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    pub fn attach_screen(&mut self) {
        self.screen = true;
    }

    pub fn halt_on_unimplemented(&mut self) {
        self.halt_on_unimplemented = true;
    }

    pub fn log_filter(&mut self, filter: String) {
        self.log_filter = Some(filter);
    }

    pub fn get_log_filter(&self) -> Option<&str> {
        self.log_filter.as_deref()
    }

    pub fn get_steps(&self) -> Option<u64> {
        self.steps
    }

    pub fn get_duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn screen_attached(&self) -> bool {
        self.screen
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        let mut config = self
            .tick_rate
            .map_or_else(ExecutorConfig::default, ExecutorConfig::with_tick_rate);
        config.halt_on_unimplemented = self.halt_on_unimplemented;
        config
    }

    fn read_image(&self) -> io::Result<Vec<u16>> {
        let path = self.image_path.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "--image is required")
        })?;
        Ok(load_image_file(path)?)
    }

    /// Builds a CPU with the image already in memory, for running on the current thread
    pub fn create_cpu(&self) -> io::Result<Cpu> {
        let image = self.read_image()?;
        let memory = Arc::new(SharedMemory::new());
        memory
            .load_image(&image)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Cpu::new(memory))
    }

    /// Builds a paused executor with the image loaded
    pub fn create_executor(&self) -> io::Result<CpuExecutor> {
        let image = self.read_image()?;
        let exec = CpuExecutor::new(Cpu::new(Arc::new(SharedMemory::new())), self.executor_config())?;
        exec.load_program(&image).map_err(io::Error::other)?;
        Ok(exec)
    }
}
