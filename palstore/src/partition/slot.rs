use crate::varint::{self, VarintError};

/// One fixed-width cell of a partition index:
/// `[key bytes][packed data offset varint, zero padded]`.
///
/// A packed offset of zero marks an empty slot.
#[derive(Clone, Copy)]
pub(crate) struct Slot<'a> {
    bytes: &'a [u8],
    key_length: usize,
}

impl<'a> Slot<'a> {
    /// `bytes` must be exactly one slot wide and longer than `key_length`.
    pub fn new(bytes: &'a [u8], key_length: usize) -> Self {
        debug_assert!(bytes.len() > key_length);
        Self { bytes, key_length }
    }

    pub fn key(&self) -> &'a [u8] {
        &self.bytes[..self.key_length]
    }

    /// Decodes the packed offset. The decode is bounded by the slot width.
    pub fn packed_offset(&self) -> Result<u64, VarintError> {
        varint::decode(&self.bytes[self.key_length..]).map(|(offset, _)| offset)
    }
}
