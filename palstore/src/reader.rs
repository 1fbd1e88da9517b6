use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::ReaderOptions;
use crate::error::{Result, StoreError};
use crate::hasher::{KeyHasher, Murmur3};
use crate::header::Header;
use crate::iter::Iter;
use crate::mmap::AlignedMmap;
use crate::partition::{Partition, PartitionInfo};
use crate::scalar::ScalarReader;
use crate::types::{BytesDecode, BytesEncode};

/// Counters captured from the header when the store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Creation timestamp as written by the builder.
    pub timestamp: i64,
    /// Declared number of keys.
    pub num_values: usize,
    /// Bytes in the index region.
    pub index_size: usize,
    /// Bytes in the data region.
    pub data_size: usize,
}

/// Outcome of [`Reader::get_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadInto {
    NotFound,
    /// The value was copied into the front of the buffer.
    Copied(usize),
    /// The buffer is too small; nothing was copied.
    Short { needed: usize },
}

/// Read-only handle on a memory-mapped store file.
///
/// Opening parses the header, then maps the index region and the data region
/// once. Every lookup and iteration after that only touches mapped memory;
/// returned keys and values borrow from the reader and are never copied.
///
/// A `Reader` is immutable, so it can be shared between threads and queried
/// concurrently. Unmapping requires ownership, which the borrow checker
/// withholds while any value or [`Iter`] is still alive.
///
/// ```no_run
/// use palstore::Reader;
///
/// # fn main() -> palstore::Result<()> {
/// let reader = Reader::open("features.store")?;
/// if let Some(value) = reader.get(b"user:42")? {
///     println!("{} bytes", value.len());
/// }
/// for entry in reader.iter() {
///     let (key, value) = entry?;
///     println!("{key:?} => {value:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Reader<H = Murmur3> {
    timestamp: i64,
    key_count: usize,
    max_key_length: usize,
    partitions: Vec<Option<Partition>>,
    metadata: Box<[u8]>,
    index: AlignedMmap,
    data: AlignedMmap,
    hasher: H,
    page_size: usize,
}

impl Reader<Murmur3> {
    /// Opens a store with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ReaderOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let hasher = Murmur3::with_seed(options.hash_seed);
        Self::open_with_hasher(path, options, hasher)
    }
}

impl<H: KeyHasher> Reader<H> {
    /// Opens a store whose builder placed keys with `hasher`.
    ///
    /// Any failure releases everything set up so far; no partially opened
    /// reader is ever returned.
    pub fn open_with_hasher(
        path: impl AsRef<Path>,
        options: ReaderOptions,
        hasher: H,
    ) -> Result<Self> {
        let path = path.as_ref();
        options.validate().map_err(StoreError::InvalidOptions)?;

        let file = File::open(path).map_err(StoreError::NoFile)?;
        let file_size = file.metadata().map_err(StoreError::StatFail)?.len();

        let mut stream = ScalarReader::new(BufReader::new(&file));
        let header = Header::parse(&mut stream, options.offset_base, file_size)?;
        let regions = header.regions(file_size)?;

        let index = AlignedMmap::map(
            &file,
            regions.index_start,
            regions.index_len,
            options.page_size,
            options.populate,
        )
        .map_err(StoreError::MmapFail)?;
        let data = AlignedMmap::map(
            &file,
            regions.data_start,
            regions.data_len,
            options.page_size,
            options.populate,
        )
        .map_err(StoreError::MmapFail)?;

        for partition in header.partitions.iter().flatten() {
            partition.check_bounds(index.len(), data.len())?;
        }

        tracing::debug!(
            path = %path.display(),
            timestamp = header.timestamp,
            key_count = header.key_count,
            partitions = header.partitions.iter().flatten().count(),
            max_key_length = header.max_key_length,
            index_size = index.len(),
            data_size = data.len(),
            "opened store"
        );

        Ok(Self {
            timestamp: header.timestamp,
            key_count: header.key_count,
            max_key_length: header.max_key_length,
            partitions: header.partitions,
            metadata: header.metadata,
            index,
            data,
            hasher,
            page_size: options.page_size,
        })
    }

    /// Looks up `key`.
    ///
    /// Returns `Ok(None)` when no key of that length or value exists. A key
    /// whose slot holds the zero packed offset is present with an empty
    /// value. Errors only come from corrupted index or data bytes.
    ///
    /// Empty slots hold all-zero key bytes, so an absent key made only of
    /// zero bytes matches any empty slot on its probe path and reads as
    /// present with an empty value. Only a full partition reports it as
    /// missing. Typed lookups such as `get_as::<Native<u64>, _>(&0)` hit
    /// this too.
    pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        let Some(partition) = self.partition(key.len()) else {
            return Ok(None);
        };
        let hash = self.hasher.hash32(key);
        self.lookup(partition, key, hash).inspect_err(|e| {
            tracing::warn!(error = %e, key_length = key.len(), "corrupted store data during lookup")
        })
    }

    fn lookup(&self, partition: &Partition, key: &[u8], hash: u32) -> Result<Option<&[u8]>> {
        let Some(slot) = partition.find(&self.index, key, hash)? else {
            return Ok(None);
        };
        let packed = slot.packed_offset()?;
        partition.record(&self.data, packed).map(Some)
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Copies the value of `key` into `buf`.
    pub fn get_into(&self, key: &[u8], buf: &mut [u8]) -> Result<ReadInto> {
        let Some(value) = self.get(key)? else {
            return Ok(ReadInto::NotFound);
        };
        if value.len() > buf.len() {
            return Ok(ReadInto::Short {
                needed: value.len(),
            });
        }
        buf[..value.len()].copy_from_slice(value);
        Ok(ReadInto::Copied(value.len()))
    }

    /// Encodes `key` with `K` and decodes the value with `V`.
    pub fn get_as<'a, 'k, K, V>(&'a self, key: &'k K::EItem) -> Result<Option<V::DItem>>
    where
        K: BytesEncode<'k>,
        V: BytesDecode<'a>,
    {
        let key = K::bytes_encode(key).map_err(|e| StoreError::Encoding(e.to_string()))?;
        match self.get(&key)? {
            Some(bytes) => V::bytes_decode(bytes)
                .map(Some)
                .map_err(|e| StoreError::Decoding(e.to_string())),
            None => Ok(None),
        }
    }

    /// Iterates over every entry, grouped by ascending key length.
    pub fn iter(&self) -> Iter<'_, H> {
        Iter::new(self)
    }
}

impl<H> fmt::Debug for Reader<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("timestamp", &self.timestamp)
            .field("key_count", &self.key_count)
            .field("max_key_length", &self.max_key_length)
            .field("index_size", &self.index.len())
            .field("data_size", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl<H> Reader<H> {
    pub(crate) fn partition(&self, key_length: usize) -> Option<&Partition> {
        self.partitions.get(key_length)?.as_ref()
    }

    pub(crate) fn index_bytes(&self) -> &[u8] {
        &self.index
    }

    pub(crate) fn data_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn stats(&self) -> Stats {
        Stats {
            timestamp: self.timestamp,
            num_values: self.key_count,
            index_size: self.index.len(),
            data_size: self.data.len(),
        }
    }

    /// Opaque metadata blob stored by the builder, possibly empty.
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Declared number of keys.
    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    /// Present partitions in ascending key length.
    pub fn partitions(&self) -> impl Iterator<Item = PartitionInfo> + '_ {
        self.partitions.iter().flatten().map(Partition::info)
    }

    /// Unmaps both regions and drops the partition table.
    pub fn close(self) {
        let Self {
            index,
            data,
            page_size,
            ..
        } = self;
        index.unmap(page_size);
        data.unmap(page_size);
    }
}
