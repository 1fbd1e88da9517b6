use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::error::{Result, StoreError};
use crate::partition::Partition;
use crate::reader::Reader;
use crate::types::BytesDecode;

/// Iterator over every `(key, value)` pair of a [`Reader`].
///
/// Entries come grouped by ascending key length and in slot order within a
/// length. Slots with a zero packed offset are skipped. Corruption found
/// while scanning is yielded once as an error, after which the iterator is
/// exhausted.
pub struct Iter<'a, H> {
    reader: &'a Reader<H>,
    key_length: usize,
    emitted: usize,
    cursor: usize,
    remaining: usize,
    done: bool,
}

impl<'a, H> Iter<'a, H> {
    pub(crate) fn new(reader: &'a Reader<H>) -> Self {
        Self {
            reader,
            key_length: 0,
            emitted: 0,
            cursor: 0,
            remaining: reader.partitions().map(|p| p.num_keys).sum(),
            done: false,
        }
    }

    /// Decodes every entry with the `K` and `V` codecs.
    pub fn decoded<K, V>(self) -> Decoded<'a, H, K, V>
    where
        K: BytesDecode<'a>,
        V: BytesDecode<'a>,
    {
        Decoded {
            inner: self,
            _codecs: PhantomData,
        }
    }

    fn advance(&mut self) {
        self.key_length += 1;
        self.emitted = 0;
        self.cursor = 0;
    }

    /// Next occupied slot of `partition` at or after the cursor.
    fn scan(&mut self, partition: &'a Partition) -> Result<(&'a [u8], &'a [u8])> {
        let reader = self.reader;
        let index = reader.index_bytes();
        loop {
            let Some(slot) = partition.slot_at(index, self.cursor)? else {
                return Err(StoreError::invalid(format!(
                    "index of key length {} ends after {} of {} keys",
                    self.key_length,
                    self.emitted,
                    partition.num_keys()
                )));
            };
            self.cursor += partition.slot_size();

            let packed = slot.packed_offset()?;
            if packed != 0 {
                let value = partition.record(reader.data_bytes(), packed)?;
                return Ok((slot.key(), value));
            }
        }
    }
}

impl<'a, H> Iterator for Iter<'a, H> {
    type Item = Result<(&'a [u8], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader;
        while !self.done {
            let partition = reader
                .partition(self.key_length)
                .filter(|p| self.emitted < p.num_keys());
            let Some(partition) = partition else {
                if self.key_length >= reader.max_key_length() {
                    self.done = true;
                } else {
                    self.advance();
                }
                continue;
            };

            return match self.scan(partition) {
                Ok(entry) => {
                    self.emitted += 1;
                    self.remaining = self.remaining.saturating_sub(1);
                    Some(Ok(entry))
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        key_length = self.key_length,
                        "corrupted store data during iteration"
                    );
                    self.done = true;
                    Some(Err(e))
                }
            };
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}

impl<H> FusedIterator for Iter<'_, H> {}

/// Iterator adapter returned by [`Iter::decoded`].
pub struct Decoded<'a, H, K, V> {
    inner: Iter<'a, H>,
    _codecs: PhantomData<fn() -> (K, V)>,
}

impl<'a, H, K, V> Iterator for Decoded<'a, H, K, V>
where
    K: BytesDecode<'a>,
    V: BytesDecode<'a>,
{
    type Item = Result<(K::DItem, V::DItem)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };
        let decoded = K::bytes_decode(key)
            .and_then(|k| V::bytes_decode(value).map(|v| (k, v)))
            .map_err(|e| StoreError::Decoding(e.to_string()));
        Some(decoded)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, H, K, V> FusedIterator for Decoded<'a, H, K, V>
where
    K: BytesDecode<'a>,
    V: BytesDecode<'a>,
{
}
