use bytemuck::{Pod, Zeroable};

use dcpu_emu_primitives::fake_enum;

fake_enum! {
    #[repr(u8)]
    pub enum GeneralRegister{
        A = 0,
        B = 1,
        C = 2,
        X = 3,
        Y = 4,
        Z = 5,
        I = 6,
        J = 7,
    }
}

impl GeneralRegister {
    #[inline]
    pub const fn index(self) -> usize {
        (self.get() & 0x7) as usize
    }
}

/// Any register an operand can name directly
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    General(GeneralRegister),
    Sp,
    Pc,
    O,
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::General(r) => core::fmt::Display::fmt(r, f),
            Self::Sp => f.write_str("SP"),
            Self::Pc => f.write_str("PC"),
            Self::O => f.write_str("O"),
        }
    }
}

/// The architectural register file. Everything resets to zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Zeroable, Pod)]
#[repr(C)]
pub struct Regs {
    pub gprs: [u16; 8],
    pub sp: u16,
    pub pc: u16,
    pub o: u16,
}

impl Regs {
    pub const fn new() -> Self {
        Self {
            gprs: [0; 8],
            sp: 0,
            pc: 0,
            o: 0,
        }
    }

    #[inline]
    pub fn gpr(&self, reg: GeneralRegister) -> u16 {
        self.gprs[reg.index()]
    }

    #[inline]
    pub fn gpr_mut(&mut self, reg: GeneralRegister) -> &mut u16 {
        &mut self.gprs[reg.index()]
    }

    pub fn get(&self, reg: Register) -> u16 {
        match reg {
            Register::General(r) => self.gpr(r),
            Register::Sp => self.sp,
            Register::Pc => self.pc,
            Register::O => self.o,
        }
    }

    pub fn set(&mut self, reg: Register, val: u16) {
        match reg {
            Register::General(r) => *self.gpr_mut(r) = val,
            Register::Sp => self.sp = val,
            Register::Pc => self.pc = val,
            Register::O => self.o = val,
        }
    }

    pub fn dump_state(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        for row in GeneralRegister::ALL.chunks(4) {
            let mut sep = "";
            for &reg in row {
                f.write_fmt(format_args!("{sep}{reg}={:04x}", self.gpr(reg)))?;
                sep = " ";
            }
            f.write_str("\n")?;
        }
        f.write_fmt(format_args!(
            "SP={:04x} PC={:04x} O={:04x}",
            self.sp, self.pc, self.o
        ))
    }
}
