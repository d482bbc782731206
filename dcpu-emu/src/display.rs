use dcpu_emu_mem::screen::{screen_row, ScreenBuffer, SCREEN_COLUMNS, SCREEN_ROWS};

/// The character shown for a screen cell. Only the low byte is used.
pub fn cell_char(cell: u16) -> char {
    match cell as u8 {
        b @ (b' '..=b'~') => b as char,
        _ => ' ',
    }
}

/// Renders the screen window as text inside a `*` frame
pub fn render(screen: &ScreenBuffer) -> String {
    let width = SCREEN_COLUMNS + 2;
    let mut out = String::with_capacity((width + 1) * (SCREEN_ROWS + 2));

    out.extend(core::iter::repeat('*').take(width));
    out.push('\n');
    for row in 0..SCREEN_ROWS {
        out.push('*');
        out.extend(screen_row(screen, row).iter().copied().map(cell_char));
        out.push('*');
        out.push('\n');
    }
    out.extend(core::iter::repeat('*').take(width));
    out.push('\n');

    out
}
