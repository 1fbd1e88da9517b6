use std::io;
use thiserror::Error;

use crate::varint::VarintError;

/// Errors that can occur when opening or reading a store file
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store path is missing or cannot be opened
    #[error("cannot open store file: {0}")]
    NoFile(#[source] io::Error),

    /// The size of the store file could not be determined
    #[error("cannot stat store file: {0}")]
    StatFail(#[source] io::Error),

    /// Allocation failed while building the partition table or metadata
    #[error("allocation failed: {0}")]
    AllocFail(#[from] std::collections::TryReserveError),

    /// The OS refused to map a region of the file
    #[error("mmap failed: {0}")]
    MmapFail(#[source] io::Error),

    /// Missing version marker, inconsistent header or out of bounds offsets
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A typed codec could not encode a lookup key
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A typed codec could not decode stored bytes
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Reader options that cannot be used to map a store
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        StoreError::InvalidData(msg.into())
    }

    /// Returns true for errors caused by a malformed store file
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, StoreError::InvalidData(_))
    }
}

impl From<VarintError> for StoreError {
    fn from(err: VarintError) -> Self {
        StoreError::InvalidData(err.to_string())
    }
}
