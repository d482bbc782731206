use core::fmt;

use dcpu_emu_regs::GeneralRegister;

use crate::decode::{FromInstructionStream, InstructionStream};
use crate::op::{BasicOpcode, ExtendedOpcode, InstructionWord};

/// A decoded operand, with any extra program word it consumed already folded in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// `A`..`J`
    Register(GeneralRegister),
    /// `[A]`..`[J]`
    Indirect(GeneralRegister),
    /// `[next word + A]`..`[next word + J]`
    Indexed { base: GeneralRegister, offset: u16 },
    Pop,
    Peek,
    Push,
    Sp,
    Pc,
    O,
    /// `[next word]`
    Absolute(u16),
    /// The next word itself. `addr` is where it was fetched from, which is also where a write to
    /// this operand lands.
    NextWord { value: u16, addr: u16 },
    /// Short literal, 0 through 31
    Literal(u8),
}

impl Operand {
    pub const MODE_POP: u8 = 0x18;
    pub const MODE_PEEK: u8 = 0x19;
    pub const MODE_PUSH: u8 = 0x1A;
    pub const MODE_SP: u8 = 0x1B;
    pub const MODE_PC: u8 = 0x1C;
    pub const MODE_O: u8 = 0x1D;
    pub const MODE_ABSOLUTE: u8 = 0x1E;
    pub const MODE_NEXT_WORD: u8 = 0x1F;
    pub const MODE_LITERAL_BASE: u8 = 0x20;

    /// The 6-bit addressing mode this operand encodes to
    pub fn mode(self) -> u8 {
        match self {
            Self::Register(r) => r.index() as u8,
            Self::Indirect(r) => 0x08 | r.index() as u8,
            Self::Indexed { base, .. } => 0x10 | base.index() as u8,
            Self::Pop => Self::MODE_POP,
            Self::Peek => Self::MODE_PEEK,
            Self::Push => Self::MODE_PUSH,
            Self::Sp => Self::MODE_SP,
            Self::Pc => Self::MODE_PC,
            Self::O => Self::MODE_O,
            Self::Absolute(_) => Self::MODE_ABSOLUTE,
            Self::NextWord { .. } => Self::MODE_NEXT_WORD,
            Self::Literal(n) => Self::MODE_LITERAL_BASE | (n & 0x1F),
        }
    }

    /// The program word that follows the instruction word for this operand, if any
    pub fn extra_word(self) -> Option<u16> {
        match self {
            Self::Indexed { offset, .. } => Some(offset),
            Self::Absolute(addr) => Some(addr),
            Self::NextWord { value, .. } => Some(value),
            _ => None,
        }
    }

    /// A literal operand, using the short form when it fits
    pub fn literal(value: u16) -> Self {
        if value < 0x20 {
            Self::Literal(value as u8)
        } else {
            Self::NextWord { value, addr: 0 }
        }
    }
}

impl FromInstructionStream<u8> for Operand {
    fn decode<I: InstructionStream>(stream: &mut I, mode: u8) -> Self {
        let reg = GeneralRegister::new(mode & 0x7);
        match mode & 0x3F {
            0x00..=0x07 => Self::Register(reg),
            0x08..=0x0F => Self::Indirect(reg),
            0x10..=0x17 => Self::Indexed {
                base: reg,
                offset: stream.next_word(),
            },
            Self::MODE_POP => Self::Pop,
            Self::MODE_PEEK => Self::Peek,
            Self::MODE_PUSH => Self::Push,
            Self::MODE_SP => Self::Sp,
            Self::MODE_PC => Self::Pc,
            Self::MODE_O => Self::O,
            Self::MODE_ABSOLUTE => Self::Absolute(stream.next_word()),
            Self::MODE_NEXT_WORD => {
                let addr = stream.position();
                Self::NextWord {
                    value: stream.next_word(),
                    addr,
                }
            }
            lit => Self::Literal(lit - Self::MODE_LITERAL_BASE),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Register(r) => fmt::Display::fmt(&r, f),
            Self::Indirect(r) => f.write_fmt(format_args!("[{r}]")),
            Self::Indexed { base, offset } => f.write_fmt(format_args!("[{offset:#x}+{base}]")),
            Self::Pop => f.write_str("POP"),
            Self::Peek => f.write_str("PEEK"),
            Self::Push => f.write_str("PUSH"),
            Self::Sp => f.write_str("SP"),
            Self::Pc => f.write_str("PC"),
            Self::O => f.write_str("O"),
            Self::Absolute(addr) => f.write_fmt(format_args!("[{addr:#x}]")),
            Self::NextWord { value, .. } => f.write_fmt(format_args!("{value:#x}")),
            Self::Literal(n) => f.write_fmt(format_args!("{n:#x}")),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    Basic {
        opcode: BasicOpcode,
        a: Operand,
        b: Operand,
    },
    /// Extended instructions take a single operand, encoded in the `b` field. Opcodes other than
    /// [`ExtendedOpcode::JSR`] decode but are not implemented.
    Extended { opcode: ExtendedOpcode, a: Operand },
}

impl FromInstructionStream<()> for Instruction {
    fn decode<I: InstructionStream>(stream: &mut I, _: ()) -> Self {
        let word = InstructionWord::from_bits(stream.next_word());

        if word.is_extended() {
            let a = Operand::decode(stream, word.b());
            Self::Extended {
                opcode: word.ext_opcode(),
                a,
            }
        } else {
            // Operand A's extra word precedes operand B's
            let a = Operand::decode(stream, word.a());
            let b = Operand::decode(stream, word.b());
            Self::Basic {
                opcode: word.opcode(),
                a,
                b,
            }
        }
    }
}

impl Instruction {
    pub fn word(&self) -> InstructionWord {
        match *self {
            Self::Basic { opcode, a, b } => InstructionWord::with_opcode(opcode)
                .insert_a(a.mode())
                .insert_b(b.mode()),
            Self::Extended { opcode, a } => InstructionWord::with_opcode(BasicOpcode::NON_BASIC)
                .insert_ext_opcode(opcode)
                .insert_b(a.mode()),
        }
    }

    /// Length of the instruction in words, 1 through 3
    pub fn len(&self) -> u16 {
        self.encode().len() as u16
    }

    pub fn encode(&self) -> Vec<u16> {
        let mut words = vec![self.word().bits()];
        match *self {
            Self::Basic { a, b, .. } => words.extend(a.extra_word().into_iter().chain(b.extra_word())),
            Self::Extended { a, .. } => words.extend(a.extra_word()),
        }
        words
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Basic { opcode, a, b } => f.write_fmt(format_args!("{opcode} {a}, {b}")),
            Self::Extended { opcode, a } => f.write_fmt(format_args!("{opcode} {a}")),
        }
    }
}

/// Encodes a sequence of instructions into a program image
pub fn assemble<'a>(program: impl IntoIterator<Item = &'a Instruction>) -> Vec<u16> {
    program.into_iter().flat_map(Instruction::encode).collect()
}
