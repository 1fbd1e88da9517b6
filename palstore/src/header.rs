use std::io::Read;

use crate::config::OffsetBase;
use crate::error::{Result, StoreError};
use crate::partition::Partition;
use crate::scalar::ScalarReader;

pub(crate) const VERSION_MARKER: &[u8] = b"VERSION_1";

/// Length prefix that `writeUTF`-style builders put in front of the marker.
const UTF_PREFIX_LEN: u64 = 2;

/// Everything read from the front of a store file before any region is
/// mapped.
///
/// Layout, all integers big-endian:
///
/// ```text
/// [prefix, ignored] "VERSION_1"
/// timestamp i64 | key_count i32 | partition_count i32 | max_key_length i32
/// partition_count x (key_length i32 | num_keys i32 | num_slots i32 |
///                    slot_size i32 | index_offset i32 | data_offset i64)
/// metadata_length i32 | metadata bytes
/// index_offset i32 | data_offset i64
/// ```
#[derive(Debug)]
pub(crate) struct Header {
    pub timestamp: i64,
    pub key_count: usize,
    pub max_key_length: usize,
    /// Indexed by key length, `max_key_length + 1` entries.
    pub partitions: Vec<Option<Partition>>,
    pub metadata: Box<[u8]>,
    pub base_offset: u64,
    pub index_offset: u64,
    pub data_offset: u64,
}

/// Absolute placement of the index and data regions in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Regions {
    pub index_start: u64,
    pub index_len: usize,
    pub data_start: u64,
    pub data_len: usize,
}

impl Header {
    pub fn parse<R: Read>(
        r: &mut ScalarReader<R>,
        base: OffsetBase,
        file_size: u64,
    ) -> Result<Self> {
        let marker_start = r
            .find_marker(VERSION_MARKER)?
            .ok_or_else(|| StoreError::invalid("version marker VERSION_1 not found"))?;

        let timestamp = r.int64("timestamp")?;
        let key_count = count(r.int32("key count")?, "key count")?;
        let partition_count = count(r.int32("partition count")?, "partition count")?;
        let max_key_length = count(r.int32("max key length")?, "max key length")?;

        // every key of the longest length occupies at least one slot
        if max_key_length as u64 >= file_size {
            return Err(StoreError::invalid(format!(
                "max key length {max_key_length} does not fit a {file_size} byte file"
            )));
        }
        if partition_count > max_key_length + 1 {
            return Err(StoreError::invalid(format!(
                "{partition_count} partitions for key lengths up to {max_key_length}"
            )));
        }

        let base_offset = match base {
            OffsetBase::AfterHeader => r.position(),
            OffsetBase::VersionPrefix => marker_start.checked_sub(UTF_PREFIX_LEN).ok_or_else(|| {
                StoreError::invalid("no length prefix in front of the version marker")
            })?,
        };

        let mut partitions = Vec::new();
        partitions.try_reserve_exact(max_key_length + 1)?;
        partitions.resize_with(max_key_length + 1, || None);

        for _ in 0..partition_count {
            let key_length = count(r.int32("partition key length")?, "partition key length")?;
            if key_length > max_key_length {
                return Err(StoreError::invalid(format!(
                    "partition key length {key_length} exceeds max key length {max_key_length}"
                )));
            }
            let num_keys = count(r.int32("partition key count")?, "partition key count")?;
            let num_slots = count(r.int32("partition slot count")?, "partition slot count")?;
            let slot_size = count(r.int32("partition slot size")?, "partition slot size")?;
            let index_offset = count(r.int32("partition index offset")?, "partition index offset")?;
            let data_offset = offset(r.int64("partition data offset")?, "partition data offset")?;
            let data_offset = usize::try_from(data_offset).map_err(|_| {
                StoreError::invalid(format!("partition data offset {data_offset} too large"))
            })?;

            if partitions[key_length].is_some() {
                return Err(StoreError::invalid(format!(
                    "duplicate partition for key length {key_length}"
                )));
            }
            partitions[key_length] = Some(Partition::new(
                key_length,
                num_keys,
                num_slots,
                slot_size,
                index_offset,
                data_offset,
            )?);
        }

        let metadata_len = count(r.int32("metadata length")?, "metadata length")?;
        if metadata_len as u64 > file_size {
            return Err(StoreError::invalid(format!(
                "metadata length {metadata_len} exceeds file size {file_size}"
            )));
        }
        let metadata = r.read_blob(metadata_len, "metadata")?.into_boxed_slice();

        let index_offset = offset(i64::from(r.int32("index offset")?), "index offset")?;
        let data_offset = offset(r.int64("data offset")?, "data offset")?;

        Ok(Self {
            timestamp,
            key_count,
            max_key_length,
            partitions,
            metadata,
            base_offset,
            index_offset,
            data_offset,
        })
    }

    /// Resolves the region offsets against the base offset. The index region
    /// runs up to the data region, which runs to the end of the file.
    pub fn regions(&self, file_size: u64) -> Result<Regions> {
        if self.data_offset < self.index_offset {
            return Err(StoreError::invalid(format!(
                "data offset {} precedes index offset {}",
                self.data_offset, self.index_offset
            )));
        }
        let index_start = self.base_offset.checked_add(self.index_offset);
        let data_start = self
            .base_offset
            .checked_add(self.data_offset)
            .filter(|&start| start <= file_size);
        let (Some(index_start), Some(data_start)) = (index_start, data_start) else {
            return Err(StoreError::invalid(format!(
                "data offset {} beyond end of {} byte file",
                self.data_offset, file_size
            )));
        };

        let index_len = usize::try_from(self.data_offset - self.index_offset)
            .map_err(|_| StoreError::invalid("index region too large to map"))?;
        let data_len = usize::try_from(file_size - data_start)
            .map_err(|_| StoreError::invalid("data region too large to map"))?;

        Ok(Regions {
            index_start,
            index_len,
            data_start,
            data_len,
        })
    }
}

fn count(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| StoreError::invalid(format!("negative {field}: {value}")))
}

fn offset(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::invalid(format!("negative {field}: {value}")))
}
