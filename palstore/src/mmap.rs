use std::fs::File;
use std::io;
use std::ops::Deref;

use memmap2::{Mmap, MmapOptions};

/// Page-aligned placement of a mapping that covers an arbitrary byte range.
///
/// The OS only maps at page-aligned file offsets, so the mapping starts at
/// the page containing the requested offset and is padded by two pages past
/// the whole pages of the requested length. The same formula is used to map
/// and to unmap, so a span always inverts itself exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSpan {
    /// File offset the OS mapping starts at.
    pub aligned_offset: u64,
    /// Distance from the start of the mapping to the requested offset.
    pub padding: usize,
    /// Length of the OS mapping.
    pub map_len: usize,
}

impl MapSpan {
    /// Returns `None` if the padded range does not fit the address space.
    pub fn new(offset: u64, len: usize, page_size: usize) -> Option<Self> {
        if page_size == 0 {
            return None;
        }
        let ps = page_size as u64;
        let aligned_offset = offset / ps * ps;
        let padding = usize::try_from(offset - aligned_offset).ok()?;
        let map_len = (len / page_size)
            .checked_mul(page_size)?
            .checked_add(page_size.checked_mul(2)?)?;
        aligned_offset.checked_add(map_len as u64)?;
        Some(Self {
            aligned_offset,
            padding,
            map_len,
        })
    }
}

/// Read-only mapping of `len` bytes at an unaligned file `offset`.
///
/// Derefs to exactly the requested bytes; the slack pages on either side are
/// never exposed.
pub struct AlignedMmap {
    mmap: Mmap,
    offset: u64,
    len: usize,
    span: MapSpan,
}

impl AlignedMmap {
    pub fn map(
        file: &File,
        offset: u64,
        len: usize,
        page_size: usize,
        populate: bool,
    ) -> io::Result<Self> {
        let span = MapSpan::new(offset, len, page_size).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot map {len} bytes at offset {offset}"),
            )
        })?;

        let mut options = MmapOptions::new();
        options.offset(span.aligned_offset).len(span.map_len);
        if populate {
            options.populate();
        }
        // SAFETY: store files are immutable once built; the mapping is
        // read-only and private to this process.
        let mmap = unsafe { options.map(file)? };

        tracing::trace!(
            offset,
            len,
            aligned_offset = span.aligned_offset,
            map_len = span.map_len,
            "mapped region"
        );

        Ok(Self {
            mmap,
            offset,
            len,
            span,
        })
    }

    /// File offset of the first visible byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn span(&self) -> MapSpan {
        self.span
    }

    /// Releases the mapping. The span is recomputed from the original offset
    /// and length so exactly the pages set up by [`map`](Self::map) go away.
    pub fn unmap(self, page_size: usize) {
        let span = MapSpan::new(self.offset, self.len, page_size);
        debug_assert_eq!(span, Some(self.span), "unmap with a different page size");
        tracing::trace!(
            aligned_offset = self.span.aligned_offset,
            map_len = self.span.map_len,
            "unmapped region"
        );
        drop(self.mmap);
    }
}

impl Deref for AlignedMmap {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.mmap[self.span.padding..self.span.padding + self.len]
    }
}

impl AsRef<[u8]> for AlignedMmap {
    fn as_ref(&self) -> &[u8] {
        self
    }
}
