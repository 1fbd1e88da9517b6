//! Read-only access to partitioned hash key-value store files.
//!
//! A store file holds immutable byte-string keys and values, partitioned by
//! key length into open-addressing hash tables. [`Reader`] parses the header
//! once, maps the index and data regions, and serves lookups and full scans
//! straight out of the mapping.

mod config;
mod error;
#[cfg(test)]
mod fixture;
mod hasher;
mod header;
mod iter;
mod mmap;
mod partition;
mod reader;
mod scalar;
pub mod types;
pub mod varint;

pub use config::{OffsetBase, ReaderOptions};
pub use error::{Result, StoreError};
pub use hasher::{DEFAULT_SEED, KeyHasher, Murmur3};
pub use iter::{Decoded, Iter};
pub use mmap::{AlignedMmap, MapSpan};
pub use partition::PartitionInfo;
pub use reader::{ReadInto, Reader, Stats};
pub use types::{Bytes, BytesDecode, BytesEncode, Native, Str};
