//! Unsigned LEB128 integers used for packed data offsets and value lengths.
//!
//! Each byte carries 7 payload bits in its low bits and a continuation flag
//! in its high bit. Groups are stored least significant first. Writers must
//! emit the smallest encoding of a value (no padding groups); the reader
//! never needs more than [`MAX_LEN`] bytes for a `u64`.

use thiserror::Error;

/// Longest encoding of a `u64`.
pub const MAX_LEN: usize = 10;

const PAYLOAD: u8 = 0x7f;
const CONTINUATION: u8 = 0x80;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// Ran off the end of the input before a terminating byte
    #[error("truncated varint after {0} bytes")]
    Truncated(usize),

    /// More groups than fit in a u64
    #[error("varint overflows u64")]
    Overflow,
}

/// Decodes a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Reads never go past
/// the end of `bytes`, so callers bound the decode by slicing the region the
/// integer must live in.
pub fn decode(bytes: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;
    for (i, &b) in bytes.iter().enumerate() {
        if i >= MAX_LEN {
            return Err(VarintError::Overflow);
        }
        let payload = u64::from(b & PAYLOAD);
        let shift = 7 * i as u32;
        // the tenth group only has room for the top bit of a u64
        if i == MAX_LEN - 1 && payload > 1 {
            return Err(VarintError::Overflow);
        }
        value |= payload << shift;
        if b & CONTINUATION == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(VarintError::Truncated(bytes.len()))
}

/// Appends the smallest encoding of `value` to `out`.
pub fn encode(mut value: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    loop {
        let b = (value as u8) & PAYLOAD;
        value >>= 7;
        if value == 0 {
            out.push(b);
            return out.len() - start;
        }
        out.push(b | CONTINUATION);
    }
}

/// Number of bytes [`encode`] writes for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}
