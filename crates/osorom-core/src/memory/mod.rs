//! Byte-addressable backing store organised in 16-byte lines.

/// Alignment checks and line/lane placement for data accesses.
pub mod access;

pub use access::{
    byte_enable_mask, extract_from_line, line_index, place_in_line, validate_alignment,
    validate_range,
};

/// Bytes per memory line; one bus beat transfers one line.
pub const LINE_BYTES: usize = 16;
/// 32-bit data lanes per line.
pub const LINE_WORDS: usize = LINE_BYTES / 4;
/// All sixteen byte enables asserted.
pub const FULL_BYTE_ENABLE: u16 = 0xFFFF;

/// One line as four little-endian 32-bit data lanes.
pub type Line = [u32; LINE_WORDS];

/// Owned backing store for the memory bus transactor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryImage {
    bytes: Vec<u8>,
}

impl MemoryImage {
    /// Allocates a zeroed image of at least `size_bytes`, rounded up to whole lines.
    #[must_use]
    pub fn new(size_bytes: usize) -> Self {
        let lines = size_bytes.div_ceil(LINE_BYTES);
        Self {
            bytes: vec![0; lines * LINE_BYTES],
        }
    }

    /// Returns the image size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the image holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the number of 16-byte lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.bytes.len() / LINE_BYTES
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reads line `line` as four little-endian lanes, or `None` past the end.
    #[must_use]
    pub fn read_line(&self, line: u32) -> Option<Line> {
        let start = usize::try_from(line).ok()?.checked_mul(LINE_BYTES)?;
        let bytes = self.bytes.get(start..start + LINE_BYTES)?;
        let mut words = [0u32; LINE_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Some(words)
    }

    /// Writes the bytes of `data` selected by `byte_enable` into line `line`.
    ///
    /// Bit `i` of `byte_enable` selects byte `i` of the line, where byte `i`
    /// lives in lane `i / 4` at bit offset `8 * (i % 4)`. Returns `false`
    /// without writing when the line is past the end.
    pub fn write_line(&mut self, line: u32, byte_enable: u16, data: Line) -> bool {
        let Some(start) = usize::try_from(line)
            .ok()
            .and_then(|line| line.checked_mul(LINE_BYTES))
        else {
            return false;
        };
        let Some(bytes) = self.bytes.get_mut(start..start + LINE_BYTES) else {
            return false;
        };
        for (index, byte) in bytes.iter_mut().enumerate() {
            if byte_enable & (1 << index) != 0 {
                *byte = data[index / 4].to_le_bytes()[index % 4];
            }
        }
        true
    }

    /// Copies `data` into the image starting at byte `offset`.
    ///
    /// Returns `false` without writing when the range does not fit.
    pub fn load(&mut self, offset: usize, data: &[u8]) -> bool {
        let Some(end) = offset.checked_add(data.len()) else {
            return false;
        };
        match self.bytes.get_mut(offset..end) {
            Some(target) => {
                target.copy_from_slice(data);
                true
            }
            None => false,
        }
    }
}
