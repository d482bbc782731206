/// A source of instruction words, normally the memory at the program counter.
pub trait InstructionStream {
    /// Address the next word will be fetched from
    fn position(&self) -> u16;

    /// Fetches the word at [`InstructionStream::position`] and advances past it
    fn next_word(&mut self) -> u16;

    fn fetch<T: FromInstructionStream<()>>(&mut self) -> T
    where
        Self: Sized,
    {
        T::decode(self, ())
    }
}

impl<'a, I: InstructionStream + ?Sized> InstructionStream for &'a mut I {
    fn position(&self) -> u16 {
        I::position(self)
    }

    fn next_word(&mut self) -> u16 {
        I::next_word(self)
    }
}

/// Decoding never fails: every 16-bit word sequence is some instruction.
pub trait FromInstructionStream<Ctx>: Sized {
    fn decode<I: InstructionStream>(stream: &mut I, ctx: Ctx) -> Self;
}

/// Streams words out of a slice that is mapped at `base`.
///
/// Words past the end of the slice read as zero, like unloaded memory.
pub struct WordStream<'a> {
    words: &'a [u16],
    base: u16,
    pos: u16,
}

impl<'a> WordStream<'a> {
    pub const fn new(words: &'a [u16], base: u16) -> Self {
        Self {
            words,
            base,
            pos: base,
        }
    }

    /// Number of words consumed so far
    pub fn consumed(&self) -> u16 {
        self.pos.wrapping_sub(self.base)
    }
}

impl InstructionStream for WordStream<'_> {
    fn position(&self) -> u16 {
        self.pos
    }

    fn next_word(&mut self) -> u16 {
        let word = self
            .words
            .get(self.consumed() as usize)
            .copied()
            .unwrap_or(0);
        self.pos = self.pos.wrapping_add(1);
        word
    }
}
