pub mod bitfield;
pub mod fake_enum;

/// Number of addressable words.
pub const ADDRESS_SPACE: usize = 0x10000;

/// Splits a 32-bit intermediate into its low word and its high word.
#[inline]
pub const fn split_wide(val: u32) -> (u16, u16) {
    (val as u16, (val >> 16) as u16)
}
