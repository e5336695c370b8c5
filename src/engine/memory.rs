//! CANOPY - In-Memory Engine
//! A volatile ordered map that satisfies the engine contract.
//! Useful for ephemeral stores and for exercising the store without disk I/O.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::Result;
use crate::types::{Key, Value};

use super::{Backend, ScanIter, WriteBatch};

/// In-memory sorted key-value engine backed by a BTreeMap.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<Key, Value>>,
}

impl MemoryBackend {
    /// Create a new, empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: Value) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> ScanIter<'_> {
        // Snapshot the range so the lock is not held across the caller's iteration.
        let entries = self.entries.read();
        let snapshot: Vec<(Key, Value)> = entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Box::new(snapshot.into_iter().map(Ok))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut entries = self.entries.write();
        for mutation in batch {
            match mutation.value {
                Some(value) => {
                    entries.insert(mutation.key, value);
                }
                None => {
                    entries.remove(&mutation.key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
