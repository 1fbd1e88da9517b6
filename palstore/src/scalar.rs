use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Result, StoreError};

/// Sequential header stream that reads big-endian scalars and tracks how many
/// bytes have been consumed, so stored offsets can be resolved against the
/// position where the header ended.
pub(crate) struct ScalarReader<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> ScalarReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn int32(&mut self, field: &'static str) -> Result<i32> {
        self.read_i32::<BigEndian>().map_err(|e| read_error(field, e))
    }

    pub fn int64(&mut self, field: &'static str) -> Result<i64> {
        self.read_i64::<BigEndian>().map_err(|e| read_error(field, e))
    }

    /// Reads exactly `len` bytes into a freshly allocated buffer.
    pub fn read_blob(&mut self, len: usize, field: &'static str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)?;
        buf.resize(len, 0);
        self.read_exact(&mut buf).map_err(|e| read_error(field, e))?;
        Ok(buf)
    }

    /// Scans forward for `marker` and returns the offset at which it starts.
    /// The stream is left positioned just past the marker.
    ///
    /// The marker must not have a proper prefix that is also a suffix, so a
    /// mismatch never needs to rewind further than the current byte.
    pub fn find_marker(&mut self, marker: &[u8]) -> Result<Option<u64>> {
        let mut matched = 0;
        let mut byte = [0u8; 1];
        while matched < marker.len() {
            match self.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(read_error("version marker", e)),
            }
            if byte[0] == marker[matched] {
                matched += 1;
            } else if byte[0] == marker[0] {
                matched = 1;
            } else {
                matched = 0;
            }
        }
        Ok(Some(self.pos - marker.len() as u64))
    }
}

impl<R: Read> Read for ScalarReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

fn read_error(field: &'static str, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        StoreError::invalid(format!("truncated header while reading {field}"))
    } else {
        StoreError::invalid(format!("failed to read {field}: {err}"))
    }
}
