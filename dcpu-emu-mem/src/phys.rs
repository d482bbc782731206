use std::sync::atomic::{AtomicU16, Ordering};

use dcpu_emu_errors::MemoryError;
use dcpu_emu_primitives::ADDRESS_SPACE;

use parking_lot::RwLock;

use crate::screen::{ScreenBuffer, SCREEN_BASE, SCREEN_WORDS};

/// The 64K-word RAM shared between the CPU thread and any number of observers.
///
/// Word accesses only take the shared side of the lock and are atomic per word, so the CPU and
/// display readers never wait on each other. [`SharedMemory::load_image`] takes the exclusive side.
#[derive(Debug)]
pub struct SharedMemory {
    words: RwLock<Box<[AtomicU16]>>,
}

impl SharedMemory {
    pub fn new() -> Self {
        Self {
            words: RwLock::new((0..ADDRESS_SPACE).map(|_| AtomicU16::new(0)).collect()),
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.words.read()[addr as usize].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write(&self, addr: u16, val: u16) {
        self.words.read()[addr as usize].store(val, Ordering::Relaxed)
    }

    /// Copies `out.len()` consecutive words starting at `base`, wrapping at the end of the
    /// address space.
    ///
    /// Each word is read atomically, but the copy as a whole is not: a concurrent writer may be
    /// observed part way through.
    pub fn read_words(&self, base: u16, out: &mut [u16]) {
        let lock = self.words.read();

        for (i, word) in out.iter_mut().enumerate() {
            let addr = (base as usize + i) % ADDRESS_SPACE;
            *word = lock[addr].load(Ordering::Relaxed);
        }
    }

    /// Returns a copy of the screen window
    pub fn read_screen(&self) -> ScreenBuffer {
        let mut screen = [0; SCREEN_WORDS];
        self.read_words(SCREEN_BASE, &mut screen);
        screen
    }

    /// Replaces the whole of memory with `image`, zeroing every word past its end.
    ///
    /// Excludes all other accesses for the duration of the copy.
    pub fn load_image(&self, image: &[u16]) -> Result<(), MemoryError> {
        if image.len() > ADDRESS_SPACE {
            return Err(MemoryError::ImageTooLarge { len: image.len() });
        }

        let mut lock = self.words.write();

        let padded = image.iter().copied().chain(core::iter::repeat(0));
        for (cell, word) in lock.iter_mut().zip(padded) {
            *cell.get_mut() = word;
        }

        tracing::debug!(len = image.len(), "loaded program image");

        Ok(())
    }
}

impl Default for SharedMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn starts_zeroed() {
        let mem = SharedMemory::new();
        assert_eq!(mem.read(0), 0);
        assert_eq!(mem.read(0xFFFF), 0);
    }

    #[test]
    fn write_then_read() {
        let mem = SharedMemory::new();
        mem.write(0x1000, 0x20);
        mem.write(0xFFFF, 0xABCD);
        assert_eq!(mem.read(0x1000), 0x20);
        assert_eq!(mem.read(0xFFFF), 0xABCD);
        assert_eq!(mem.read(0x1001), 0);
    }

    #[test]
    fn load_image_zero_fills_the_remainder() {
        let mem = SharedMemory::new();
        mem.write(0x0003, 0x1111);
        mem.write(0x8000, 0x2222);

        mem.load_image(&[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(2), 3);
        assert_eq!(mem.read(3), 0);
        assert_eq!(mem.read(0x8000), 0);
    }

    #[test]
    fn load_image_accepts_a_full_address_space() {
        let mem = SharedMemory::new();
        let image = vec![0x5A5A; ADDRESS_SPACE];
        mem.load_image(&image).unwrap();
        assert_eq!(mem.read(0xFFFF), 0x5A5A);
    }

    #[test]
    fn load_image_rejects_oversized_images() {
        let mem = SharedMemory::new();
        mem.write(0, 9);
        let image = vec![1; ADDRESS_SPACE + 1];
        assert_eq!(
            mem.load_image(&image),
            Err(MemoryError::ImageTooLarge {
                len: ADDRESS_SPACE + 1
            })
        );
        assert_eq!(mem.read(0), 9);
    }

    #[test]
    fn read_words_wraps_around() {
        let mem = SharedMemory::new();
        mem.write(0xFFFF, 1);
        mem.write(0x0000, 2);
        let mut out = [0; 2];
        mem.read_words(0xFFFF, &mut out);
        assert_eq!(out, [1, 2]);
    }

    #[test]
    fn screen_is_the_window_at_e000() {
        let mem = SharedMemory::new();
        mem.write(SCREEN_BASE - 1, 0xFFFF);
        mem.write(SCREEN_BASE, 0x0041);
        mem.write(SCREEN_BASE + SCREEN_WORDS as u16 - 1, 0x0042);
        mem.write(SCREEN_BASE + SCREEN_WORDS as u16, 0xFFFF);

        let screen = mem.read_screen();
        assert_eq!(screen[0], 0x0041);
        assert_eq!(screen[SCREEN_WORDS - 1], 0x0042);
        assert_eq!(screen.iter().filter(|&&w| w == 0xFFFF).count(), 0);
    }

    #[test]
    fn concurrent_screen_reads_never_see_torn_words() {
        let mem = Arc::new(SharedMemory::new());
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let mem = mem.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    for word in mem.read_screen() {
                        assert!(word == 0x0000 || word == 0xFF00 || word == 0x00FF);
                    }
                }
            })
        };

        for round in 0..200u16 {
            let val = if round % 2 == 0 { 0xFF00 } else { 0x00FF };
            for i in 0..SCREEN_WORDS as u16 {
                mem.write(SCREEN_BASE + i, val);
            }
        }

        done.store(true, Ordering::Release);
        reader.join().unwrap();
    }
}
