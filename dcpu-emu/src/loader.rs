use std::{fs, io, path::Path};

use dcpu_emu_errors::MemoryError;
use dcpu_emu_primitives::ADDRESS_SPACE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read image: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    TooLarge(#[from] MemoryError),
}

impl From<LoadError> for io::Error {
    fn from(value: LoadError) -> Self {
        match value {
            LoadError::Io(e) => e,
            e @ LoadError::TooLarge(_) => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

/// Decodes a raw program image: consecutive big-endian byte pairs form one word each.
///
/// A trailing odd byte becomes the high byte of a final word whose low byte is zero.
pub fn decode_image(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

pub fn load_image_file(path: &Path) -> Result<Vec<u16>, LoadError> {
    let bytes = fs::read(path)?;
    let words = decode_image(&bytes);

    if words.len() > ADDRESS_SPACE {
        return Err(MemoryError::ImageTooLarge { len: words.len() }.into());
    }

    tracing::debug!(path = %path.display(), words = words.len(), "decoded image");

    Ok(words)
}
