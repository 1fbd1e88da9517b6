use crate::hasher::DEFAULT_SEED;

/// Where stored partition and region offsets are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetBase {
    /// The byte right after `max_key_length`, the end of the fixed header.
    #[default]
    AfterHeader,
    /// The two-byte length prefix written in front of `VERSION_1` by
    /// Java-style `writeUTF` builders.
    VersionPrefix,
}

/// Options for opening a store
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// How stored offsets are resolved (default: `AfterHeader`)
    pub offset_base: OffsetBase,

    /// Seed for the slot hash (default: 42)
    pub hash_seed: u32,

    /// Fault in all mapped pages up front (default: false)
    pub populate: bool,

    /// Page size used to align mappings (default: the OS page size)
    pub page_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            offset_base: OffsetBase::default(),
            hash_seed: DEFAULT_SEED,
            populate: false,
            page_size: page_size::get(),
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how stored offsets are resolved
    pub fn offset_base(mut self, base: OffsetBase) -> Self {
        self.offset_base = base;
        self
    }

    /// Set the slot hash seed
    pub fn hash_seed(mut self, seed: u32) -> Self {
        self.hash_seed = seed;
        self
    }

    /// Pre-fault mapped pages when opening
    pub fn populate(mut self, enabled: bool) -> Self {
        self.populate = enabled;
        self
    }

    /// Override the mapping alignment. Must be a power of two and a multiple
    /// of the OS page size.
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let os = page_size::get();
        if !self.page_size.is_power_of_two() || self.page_size % os != 0 {
            return Err(format!(
                "page size {} is not a power-of-two multiple of the OS page size {}",
                self.page_size, os
            ));
        }
        Ok(())
    }
}
