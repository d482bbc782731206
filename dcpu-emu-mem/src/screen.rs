/// First word of the memory-mapped screen window
pub const SCREEN_BASE: u16 = 0xE000;

pub const SCREEN_COLUMNS: usize = 36;
pub const SCREEN_ROWS: usize = 14;

/// Number of words in the screen window
pub const SCREEN_WORDS: usize = SCREEN_COLUMNS * SCREEN_ROWS;

/// A point-in-time copy of the screen window, row-major.
pub type ScreenBuffer = [u16; SCREEN_WORDS];

/// Returns the cells of row `row` of `screen`.
///
/// ## Panics
/// Panics if `row >= SCREEN_ROWS`
pub fn screen_row(screen: &ScreenBuffer, row: usize) -> &[u16] {
    &screen[row * SCREEN_COLUMNS..][..SCREEN_COLUMNS]
}
