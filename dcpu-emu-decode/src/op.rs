use dcpu_emu_primitives::{bitfield, fake_enum};

fake_enum! {
    #[repr(u8)]
    pub enum BasicOpcode{
        SET = 0x1,
        ADD = 0x2,
        SUB = 0x3,
        MUL = 0x4,
        DIV = 0x5,
        MOD = 0x6,
        SHL = 0x7,
        SHR = 0x8,
        AND = 0x9,
        BOR = 0xA,
        XOR = 0xB,
        IFE = 0xC,
        IFN = 0xD,
        IFG = 0xE,
        IFB = 0xF,
    }
}

impl BasicOpcode {
    /// The encoding that introduces an extended instruction instead
    pub const NON_BASIC: Self = Self::new(0);

    /// Whether O is written before the result rather than after it
    pub fn writes_overflow_first(self) -> bool {
        matches!(self, Self::ADD | Self::SUB | Self::MUL)
    }
}

fake_enum! {
    #[repr(u8)]
    pub enum ExtendedOpcode{
        JSR = 0x01,
    }
}

bitfield! {
    /// The first word of every instruction
    pub struct InstructionWord : u16{
        pub opcode @ 0..4: BasicOpcode,
        pub a @ 4..10: u8,
        pub b @ 10..16: u8,
        pub ext_opcode @ 4..10: ExtendedOpcode,
    }
}

impl InstructionWord {
    #[inline]
    pub fn is_extended(&self) -> bool {
        self.opcode() == BasicOpcode::NON_BASIC
    }
}
