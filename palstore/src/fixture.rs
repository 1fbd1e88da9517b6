//! Builds store files for tests, laid out exactly as the reader expects.

use std::collections::BTreeMap;
use std::io::Write;

use tempfile::NamedTempFile;

use crate::config::OffsetBase;
use crate::hasher::{KeyHasher, Murmur3};
use crate::header::VERSION_MARKER;
use crate::varint;

/// Bytes of one partition descriptor in the header.
pub(crate) const PARTITION_ENTRY_LEN: usize = 5 * 4 + 8;
/// `\0\x09VERSION_1` plus timestamp, key count, partition count, max length.
pub(crate) const FIXED_HEADER_LEN: usize = 2 + 9 + 8 + 4 + 4 + 4;

struct BuiltPartition {
    key_length: usize,
    num_keys: usize,
    num_slots: usize,
    slot_size: usize,
    index: Vec<u8>,
    data: Vec<u8>,
}

/// `None` values are written as a zero packed offset.
pub(crate) struct StoreBuilder {
    partitions: BTreeMap<usize, BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    slots: BTreeMap<usize, usize>,
    load_factor: f64,
    timestamp: i64,
    declared_keys: Option<usize>,
    metadata: Vec<u8>,
    prefix: Vec<u8>,
    offset_base: OffsetBase,
    hasher: Murmur3,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self {
            partitions: BTreeMap::new(),
            slots: BTreeMap::new(),
            load_factor: 0.75,
            timestamp: 1_447_624_649_853,
            declared_keys: None,
            metadata: Vec::new(),
            prefix: Vec::new(),
            offset_base: OffsetBase::AfterHeader,
            hasher: Murmur3::default(),
        }
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref().to_vec();
        self.partitions
            .entry(key.len())
            .or_default()
            .insert(key, Some(value.as_ref().to_vec()));
        self
    }

    pub fn insert_all<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        for (k, v) in entries {
            self = self.insert(k, v);
        }
        self
    }

    /// Occupies a slot with `key` but a zero packed offset. Not counted in
    /// any key count.
    pub fn insert_zero_offset(mut self, key: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref().to_vec();
        self.partitions
            .entry(key.len())
            .or_default()
            .insert(key, None);
        self
    }

    /// Forces the slot count of the partition for `key_length`.
    pub fn num_slots(mut self, key_length: usize, slots: usize) -> Self {
        self.slots.insert(key_length, slots);
        self
    }

    pub fn load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn declared_keys(mut self, count: usize) -> Self {
        self.declared_keys = Some(count);
        self
    }

    pub fn metadata(mut self, metadata: impl AsRef<[u8]>) -> Self {
        self.metadata = metadata.as_ref().to_vec();
        self
    }

    pub fn prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_vec();
        self
    }

    pub fn offset_base(mut self, base: OffsetBase) -> Self {
        self.offset_base = base;
        self
    }

    pub fn hash_seed(mut self, seed: u32) -> Self {
        self.hasher = Murmur3::with_seed(seed);
        self
    }

    fn build_partition(
        &self,
        key_length: usize,
        entries: &BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) -> BuiltPartition {
        let default_slots = ((entries.len() as f64 / self.load_factor).ceil() as usize).max(1);
        let num_slots = self.slots.get(&key_length).copied().unwrap_or(default_slots);
        assert!(num_slots >= entries.len(), "not enough slots for key length {key_length}");

        // data offsets start at 1 so that 0 can mark empty slots
        let mut data = vec![0u8];
        let mut placed = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let offset = match value {
                Some(value) => {
                    let offset = data.len() as u64;
                    varint::encode(value.len() as u64, &mut data);
                    data.extend_from_slice(value);
                    offset
                }
                None => 0,
            };
            placed.push((key, offset));
        }

        let width = placed
            .iter()
            .map(|&(_, offset)| varint::encoded_len(offset))
            .max()
            .unwrap_or(1);
        let slot_size = key_length + width;

        let mut index = vec![0u8; slot_size * num_slots];
        let mut used = vec![false; num_slots];
        for (key, offset) in placed {
            let mut slot = (u64::from(self.hasher.hash32(key)) % num_slots as u64) as usize;
            while used[slot] {
                slot = (slot + 1) % num_slots;
            }
            used[slot] = true;

            let start = slot * slot_size;
            index[start..start + key_length].copy_from_slice(key);
            let mut packed = Vec::new();
            varint::encode(offset, &mut packed);
            index[start + key_length..start + key_length + packed.len()].copy_from_slice(&packed);
        }

        BuiltPartition {
            key_length,
            num_keys: entries.values().filter(|v| v.is_some()).count(),
            num_slots,
            slot_size,
            index,
            data,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let built: Vec<BuiltPartition> = self
            .partitions
            .iter()
            .map(|(&len, entries)| self.build_partition(len, entries))
            .collect();

        let key_count = self
            .declared_keys
            .unwrap_or_else(|| built.iter().map(|p| p.num_keys).sum());
        let max_key_length = built.last().map(|p| p.key_length).unwrap_or(0);

        let mut out = self.prefix.clone();
        let utf_start = out.len();
        out.extend_from_slice(&[0, VERSION_MARKER.len() as u8]);
        out.extend_from_slice(VERSION_MARKER);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&(key_count as i32).to_be_bytes());
        out.extend_from_slice(&(built.len() as i32).to_be_bytes());
        out.extend_from_slice(&(max_key_length as i32).to_be_bytes());
        let header_end = out.len();

        let base = match self.offset_base {
            OffsetBase::AfterHeader => header_end,
            OffsetBase::VersionPrefix => utf_start,
        };
        let index_start = header_end + built.len() * PARTITION_ENTRY_LEN + 4 + self.metadata.len() + 12;

        let mut index_offset = 0usize;
        let mut data_offset = 0usize;
        for p in &built {
            out.extend_from_slice(&(p.key_length as i32).to_be_bytes());
            out.extend_from_slice(&(p.num_keys as i32).to_be_bytes());
            out.extend_from_slice(&(p.num_slots as i32).to_be_bytes());
            out.extend_from_slice(&(p.slot_size as i32).to_be_bytes());
            out.extend_from_slice(&(index_offset as i32).to_be_bytes());
            out.extend_from_slice(&(data_offset as i64).to_be_bytes());
            index_offset += p.index.len();
            data_offset += p.data.len();
        }

        out.extend_from_slice(&(self.metadata.len() as i32).to_be_bytes());
        out.extend_from_slice(&self.metadata);

        let region_index = index_start - base;
        out.extend_from_slice(&(region_index as i32).to_be_bytes());
        out.extend_from_slice(&((region_index + index_offset) as i64).to_be_bytes());
        assert_eq!(out.len(), index_start);

        for p in &built {
            out.extend_from_slice(&p.index);
        }
        for p in &built {
            out.extend_from_slice(&p.data);
        }
        out
    }

    pub fn write(&self) -> NamedTempFile {
        write_bytes(&self.build())
    }
}

pub(crate) fn write_bytes(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Two 3-byte keys and one 5-byte key with one-byte values.
pub(crate) fn numbers() -> StoreBuilder {
    StoreBuilder::new()
        .insert("one", [6])
        .insert("two", [7])
        .insert("three", [8])
}
