use thiserror::Error;

/// Abnormal conditions raised while executing an instruction.
///
/// Arithmetic and addressing are total over the 16-bit domain, so the only thing that can go
/// wrong during a tick is running into an instruction the emulator does not implement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum CpuException {
    /// An extended opcode other than `JSR`. The instruction's words and operand were consumed but
    /// nothing was executed.
    #[error("unimplemented extended opcode {opcode:#04x} at {address:#06x}")]
    UnimplementedInstruction { opcode: u8, address: u16 },
}

impl CpuException {
    /// Address of the instruction word that raised the exception
    pub fn address(&self) -> u16 {
        match self {
            Self::UnimplementedInstruction { address, .. } => *address,
        }
    }
}

pub type CpuResult<T> = std::result::Result<T, CpuException>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MemoryError {
    #[error("program image of {len} words does not fit the 65536-word address space")]
    ImageTooLarge { len: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ExecutorError {
    #[error("the executor must be paused before a program can be loaded")]
    Running,
    #[error(transparent)]
    Memory(#[from] MemoryError),
}
