use dcpu_emu_decode::{
    decode::InstructionStream,
    instr::{Instruction, Operand},
    op::{BasicOpcode, ExtendedOpcode},
};
use dcpu_emu_errors::{CpuException, CpuResult};
use dcpu_emu_mem::phys::SharedMemory;
use dcpu_emu_primitives::split_wide;
use dcpu_emu_regs::{Register, Regs};

use std::sync::Arc;

/// Where a resolved operand lives
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    Register(Register),
    Memory(u16),
    /// Short and next-word literals read as a value; writes to a short literal go nowhere
    Discard,
}

/// An operand after its addressing mode has been applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Resolved {
    pub value: u16,
    pub location: Location,
}

/// The outcome of a basic opcode, before write-back
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Store `value` to operand A and set O if `overflow` is present, in the order given by
    /// [`BasicOpcode::writes_overflow_first`]
    Store { value: u16, overflow: Option<u16> },
    /// Conditional instruction; the next instruction is skipped unless the condition holds
    Test(bool),
    None,
}

/// Evaluates a basic opcode. All intermediates are at least 32 bits wide before truncation.
pub fn compute(opcode: BasicOpcode, a: u16, b: u16) -> Effect {
    let store = |value, overflow| Effect::Store { value, overflow };

    match opcode {
        BasicOpcode::SET => store(b, None),
        BasicOpcode::ADD => {
            let (value, carry) = a.overflowing_add(b);
            store(value, Some(carry as u16))
        }
        BasicOpcode::SUB => {
            let (value, borrow) = a.overflowing_sub(b);
            store(value, Some(if borrow { 0xFFFF } else { 0 }))
        }
        BasicOpcode::MUL => {
            let (value, high) = split_wide(a as u32 * b as u32);
            store(value, Some(high))
        }
        BasicOpcode::DIV => match b {
            0 => store(0, Some(0)),
            b => store(a / b, Some((((a as u32) << 16) / b as u32) as u16)),
        },
        BasicOpcode::MOD => store(a.checked_rem(b).unwrap_or(0), None),
        BasicOpcode::SHL => {
            let wide = (a as u64).checked_shl(b as u32).unwrap_or(0);
            store(wide as u16, Some((wide >> 16) as u16))
        }
        BasicOpcode::SHR => {
            let wide = ((a as u64) << 16).checked_shr(b as u32).unwrap_or(0);
            store(a.checked_shr(b as u32).unwrap_or(0), Some(wide as u16))
        }
        BasicOpcode::AND => store(a & b, None),
        BasicOpcode::BOR => store(a | b, None),
        BasicOpcode::XOR => store(a ^ b, None),
        BasicOpcode::IFE => Effect::Test(a == b),
        BasicOpcode::IFN => Effect::Test(a != b),
        BasicOpcode::IFG => Effect::Test(a > b),
        BasicOpcode::IFB => Effect::Test((a & b) != 0),
        _ => Effect::None,
    }
}

/// Fetches instruction words at the program counter
pub struct Stream<'a> {
    pc: &'a mut u16,
    memory: &'a SharedMemory,
}

impl InstructionStream for Stream<'_> {
    fn position(&self) -> u16 {
        *self.pc
    }

    fn next_word(&mut self) -> u16 {
        let word = self.memory.read(*self.pc);
        *self.pc = self.pc.wrapping_add(1);
        word
    }
}

pub struct Cpu {
    regs: Regs,
    memory: Arc<SharedMemory>,
    skip: bool,
}

impl Cpu {
    pub fn new(memory: Arc<SharedMemory>) -> Self {
        Self {
            regs: Regs::new(),
            memory,
            skip: false,
        }
    }

    pub fn regs(&self) -> &Regs {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut Regs {
        &mut self.regs
    }

    pub fn memory(&self) -> &Arc<SharedMemory> {
        &self.memory
    }

    /// Whether the next instruction will be skipped
    pub fn skip_pending(&self) -> bool {
        self.skip
    }

    pub fn reset(&mut self) {
        self.regs = Regs::new();
        self.skip = false;
    }

    /// Fetches, decodes and executes one instruction.
    ///
    /// Operands are resolved in order before the pending skip is consulted, so a skipped instruction still
    /// moves the program counter past its extra words and still applies `PUSH`/`POP` stack pointer
    /// adjustments. Nothing else about it takes effect.
    ///
    /// ## Errors
    /// Returns [`CpuException::UnimplementedInstruction`] for any extended opcode other than
    /// `JSR`. The instruction is consumed as a no-op, so ticking can simply continue.
    pub fn tick(&mut self) -> CpuResult<()> {
        let address = self.regs.pc;

        let instr: Instruction = Stream {
            pc: &mut self.regs.pc,
            memory: &self.memory,
        }
        .fetch();

        match instr {
            Instruction::Basic { opcode, a, b } => {
                // Operand A sees PC as it stands after its own extra word, before B fetches
                let end = self.regs.pc;
                self.regs.pc = address.wrapping_add(1 + a.extra_word().is_some() as u16);
                let a = self.resolve(a);
                self.regs.pc = end;
                let b = self.resolve(b);
                if self.take_skip(address, &instr) {
                    return Ok(());
                }

                match compute(opcode, a.value, b.value) {
                    Effect::Store {
                        value,
                        overflow: Some(overflow),
                    } if opcode.writes_overflow_first() => {
                        self.regs.o = overflow;
                        self.store(a.location, value);
                    }
                    Effect::Store { value, overflow } => {
                        self.store(a.location, value);
                        if let Some(overflow) = overflow {
                            self.regs.o = overflow;
                        }
                    }
                    Effect::Test(holds) => self.skip = !holds,
                    Effect::None => {}
                }

                Ok(())
            }
            Instruction::Extended { opcode, a } => {
                let a = self.resolve(a);
                if self.take_skip(address, &instr) {
                    return Ok(());
                }

                match opcode {
                    ExtendedOpcode::JSR => {
                        self.push(self.regs.pc);
                        self.regs.pc = a.value;
                        Ok(())
                    }
                    opcode => Err(CpuException::UnimplementedInstruction {
                        opcode: opcode.get(),
                        address,
                    }),
                }
            }
        }
    }

    fn take_skip(&mut self, address: u16, instr: &Instruction) -> bool {
        if core::mem::take(&mut self.skip) {
            tracing::debug!(address, %instr, "skipped");
            true
        } else {
            tracing::trace!(address, %instr, "execute");
            false
        }
    }

    /// Applies an operand's addressing mode, including any stack pointer adjustment
    pub fn resolve(&mut self, op: Operand) -> Resolved {
        let location = match op {
            Operand::Register(r) => Location::Register(Register::General(r)),
            Operand::Indirect(r) => Location::Memory(self.regs.gpr(r)),
            Operand::Indexed { base, offset } => {
                Location::Memory(offset.wrapping_add(self.regs.gpr(base)))
            }
            Operand::Pop => {
                let sp = self.regs.sp;
                self.regs.sp = sp.wrapping_add(1);
                Location::Memory(sp)
            }
            Operand::Peek => Location::Memory(self.regs.sp),
            Operand::Push => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                Location::Memory(self.regs.sp)
            }
            Operand::Sp => Location::Register(Register::Sp),
            Operand::Pc => Location::Register(Register::Pc),
            Operand::O => Location::Register(Register::O),
            Operand::Absolute(addr) => Location::Memory(addr),
            Operand::NextWord { value, addr } => {
                return Resolved {
                    value,
                    location: Location::Memory(addr),
                }
            }
            Operand::Literal(n) => {
                return Resolved {
                    value: n as u16,
                    location: Location::Discard,
                }
            }
        };

        Resolved {
            value: self.load(location),
            location,
        }
    }

    fn load(&self, location: Location) -> u16 {
        match location {
            Location::Register(r) => self.regs.get(r),
            Location::Memory(addr) => self.memory.read(addr),
            Location::Discard => 0,
        }
    }

    fn store(&mut self, location: Location, value: u16) {
        match location {
            Location::Register(r) => self.regs.set(r, value),
            Location::Memory(addr) => self.memory.write(addr, value),
            Location::Discard => tracing::trace!(value, "write to literal discarded"),
        }
    }

    fn push(&mut self, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.memory.write(self.regs.sp, value);
    }
}
