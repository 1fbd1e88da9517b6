use crate::error::{Result, StoreError};
use crate::varint;

mod slot;
pub(crate) use slot::Slot;

/// Public description of one partition of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    pub key_length: usize,
    pub num_keys: usize,
    pub num_slots: usize,
    pub slot_size: usize,
}

/// Open-addressing hash table holding every key of one length.
///
/// The partition never owns memory: `index_offset` and `data_offset` locate
/// its slot array and its records inside the reader's index and data maps.
/// Lookups probe linearly from `hash mod num_slots` and give up after
/// `num_slots` probes, the table is never rehashed.
#[derive(Debug, Clone)]
pub(crate) struct Partition {
    key_length: usize,
    num_keys: usize,
    num_slots: usize,
    slot_size: usize,
    index_offset: usize,
    index_size: usize,
    data_offset: usize,
}

impl Partition {
    pub fn new(
        key_length: usize,
        num_keys: usize,
        num_slots: usize,
        slot_size: usize,
        index_offset: usize,
        data_offset: usize,
    ) -> Result<Self> {
        if num_slots == 0 {
            return Err(StoreError::invalid(format!(
                "partition for key length {key_length} has no slots"
            )));
        }
        if slot_size <= key_length {
            return Err(StoreError::invalid(format!(
                "slot size {slot_size} leaves no room for offsets after {key_length} key bytes"
            )));
        }
        let index_size = slot_size.checked_mul(num_slots).ok_or_else(|| {
            StoreError::invalid(format!("index size overflows for key length {key_length}"))
        })?;

        Ok(Self {
            key_length,
            num_keys,
            num_slots,
            slot_size,
            index_offset,
            index_size,
            data_offset,
        })
    }

    /// Checks that the slot array lies inside the index map and the first
    /// record inside the data map.
    pub fn check_bounds(&self, index_len: usize, data_len: usize) -> Result<()> {
        let index_end = self.index_offset.checked_add(self.index_size);
        if index_end.is_none_or(|end| end > index_len) {
            return Err(StoreError::invalid(format!(
                "index of key length {} ({} bytes at {}) exceeds index region of {} bytes",
                self.key_length, self.index_size, self.index_offset, index_len
            )));
        }
        if self.data_offset > data_len {
            return Err(StoreError::invalid(format!(
                "data of key length {} starts at {} past data region of {} bytes",
                self.key_length, self.data_offset, data_len
            )));
        }
        Ok(())
    }

    pub fn info(&self) -> PartitionInfo {
        PartitionInfo {
            key_length: self.key_length,
            num_keys: self.num_keys,
            num_slots: self.num_slots,
            slot_size: self.slot_size,
        }
    }

    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    fn slots<'a>(&self, index: &'a [u8]) -> Result<&'a [u8]> {
        self.index_offset
            .checked_add(self.index_size)
            .and_then(|end| index.get(self.index_offset..end))
            .ok_or_else(|| {
                StoreError::invalid(format!(
                    "index of key length {} outside index region",
                    self.key_length
                ))
            })
    }

    /// Slot starting `offset` bytes into this partition's slot array, or
    /// `None` once `offset` reaches the end of the array.
    pub fn slot_at<'a>(&self, index: &'a [u8], offset: usize) -> Result<Option<Slot<'a>>> {
        let slots = self.slots(index)?;
        Ok(slots
            .get(offset..offset + self.slot_size)
            .map(|bytes| Slot::new(bytes, self.key_length)))
    }

    /// Probes for `key`, starting from its home slot. `key` must be
    /// `key_length` bytes long.
    pub fn find<'a>(&self, index: &'a [u8], key: &[u8], hash: u32) -> Result<Option<Slot<'a>>> {
        debug_assert_eq!(key.len(), self.key_length);
        let slots = self.slots(index)?;

        let home = (u64::from(hash) % self.num_slots as u64) as usize;
        let mut offset = home * self.slot_size;
        for _ in 0..self.num_slots {
            let slot = Slot::new(&slots[offset..offset + self.slot_size], self.key_length);
            if slot.key() == key {
                return Ok(Some(slot));
            }
            offset += self.slot_size;
            if offset == self.index_size {
                offset = 0;
            }
        }
        Ok(None)
    }

    /// Resolves a packed offset to its value bytes.
    ///
    /// Zero resolves to an empty value. Any other offset points at a
    /// `[length varint][value]` record relative to this partition's data; the
    /// record must end inside the data map.
    pub fn record<'a>(&self, data: &'a [u8], packed: u64) -> Result<&'a [u8]> {
        if packed == 0 {
            return Ok(&[]);
        }
        let start = usize::try_from(packed)
            .ok()
            .and_then(|rel| self.data_offset.checked_add(rel))
            .filter(|&start| start < data.len())
            .ok_or_else(|| {
                StoreError::invalid(format!(
                    "record offset {packed} of key length {} outside data region",
                    self.key_length
                ))
            })?;

        let (len, n) = varint::decode(&data[start..])?;
        let value_start = start + n;
        let value_end = usize::try_from(len)
            .ok()
            .and_then(|len| value_start.checked_add(len))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                StoreError::invalid(format!(
                    "value of {len} bytes at {value_start} overruns data region"
                ))
            })?;
        Ok(&data[value_start..value_end])
    }
}
