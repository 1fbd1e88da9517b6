use std::io::Cursor;

/// Seed the store builder uses when placing keys into slots.
pub const DEFAULT_SEED: u32 = 42;

/// 32-bit hash used to pick a key's home slot within its partition.
///
/// Readers and builders must agree on the function and the seed, otherwise
/// lookups probe the wrong slots and report keys as missing.
pub trait KeyHasher: Send + Sync {
    fn hash32(&self, key: &[u8]) -> u32;
}

/// MurmurHash3, x86 32-bit variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Murmur3 {
    seed: u32,
}

impl Murmur3 {
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl Default for Murmur3 {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl KeyHasher for Murmur3 {
    fn hash32(&self, key: &[u8]) -> u32 {
        murmur3::murmur3_32(&mut Cursor::new(key), self.seed)
            .expect("reading from an in-memory cursor cannot fail")
    }
}
