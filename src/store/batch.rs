//! CANOPY - Batch
//! Stages sets and deletes against one store and commits them as a single
//! atomic engine write.

use std::time::Duration;

use crate::engine::WriteBatch;
use crate::error::Result;

use super::{envelope, path, Store};

/// Accumulator of mutations bound to a [`Store`].
///
/// Envelopes are stamped with the store's logical clock when a mutation is
/// staged, not when the batch is written. A batch can be reused after
/// [`Batch::write`].
pub struct Batch<'a> {
    store: &'a Store,
    staged: WriteBatch,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            staged: WriteBatch::new(),
        }
    }

    /// Stage a value that never expires.
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], value: &[u8]) -> Result<()> {
        self.set_with_ttl(path, value, Duration::ZERO)
    }

    /// Stage a value that expires `ttl` from now.
    pub fn set_with_ttl<S: AsRef<str>>(
        &mut self,
        path: &[S],
        value: &[u8],
        ttl: Duration,
    ) -> Result<()> {
        let key = path::join(path)?;
        let block = envelope::encode(value, ttl, self.store.shared.clock.now());
        self.staged.put(key, block);
        Ok(())
    }

    /// Stage a delete.
    pub fn delete<S: AsRef<str>>(&mut self, path: &[S]) -> Result<()> {
        let key = path::join(path)?;
        self.staged.delete(key);
        Ok(())
    }

    /// Number of staged mutations.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Commit every staged mutation atomically. The batch is emptied
    /// whether or not the commit succeeds.
    pub fn write(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        let shared = &self.store.shared;
        shared.with_engine(|engine| engine.write_batch(staged))?;
        shared.metrics.record_batch_write();
        Ok(())
    }
}
