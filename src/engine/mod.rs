//! CANOPY - Storage Engine Module
//! The contract canopy needs from an ordered key-value engine, plus the
//! engines it ships with.
//!
//! The store never relies on anything beyond these primitives: point reads
//! and writes, ordered prefix scans, and an atomic multi-key batch.

pub mod memory;
pub mod sled_backend;

use crate::error::Result;
use crate::types::{Key, Mutation, Value};

pub use self::memory::MemoryBackend;
pub use self::sled_backend::SledBackend;

/// Ordered `(key, value)` pairs yielded by a scan. Each item may carry the
/// engine's iteration error.
pub type ScanIter<'a> = Box<dyn Iterator<Item = Result<(Key, Value)>> + 'a>;

/// An ordered, byte-oriented key-value engine.
///
/// Keys must be compared byte-lexicographically so that every key sharing
/// a prefix is contiguous in scan order. Implementations must be safe to
/// share between threads.
pub trait Backend: Send + Sync {
    /// Returns the human-readable name of this engine.
    fn name(&self) -> &str;

    /// Fetch the raw bytes stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: Value) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Forward scan over every key starting with `prefix`.
    /// An empty prefix scans the whole keyspace.
    fn scan_prefix(&self, prefix: &[u8]) -> ScanIter<'_>;

    /// Apply every mutation in `batch` as one atomic unit.
    fn write_batch(&self, batch: WriteBatch) -> Result<()>;

    /// Persist buffered writes.
    fn flush(&self) -> Result<()>;
}

/// Engine-neutral accumulator of puts and deletes, applied atomically by
/// [`Backend::write_batch`].
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a put.
    pub fn put(&mut self, key: Key, value: Value) {
        self.mutations.push(Mutation::put(key, value));
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: Key) {
        self.mutations.push(Mutation::delete(key));
    }

    /// Number of staged mutations.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

}

impl IntoIterator for WriteBatch {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}
