//! CANOPY - Sled Engine
//! Persistent backend built on sled, an embedded log-structured store.
//!
//! sled takes an exclusive lock on its directory, so opening a location that
//! is already open fails with the engine's own error.

use crate::config::Config;
use crate::error::Result;
use crate::types::{Key, Value};

use super::{Backend, ScanIter, WriteBatch};

/// The persistent storage backend.
pub struct SledBackend {
    db: sled::Db,
    /// Flush after every mutation.
    sync_writes: bool,
}

impl SledBackend {
    /// Open or create a sled database at `config.data_dir`.
    pub fn open(config: &Config) -> Result<Self> {
        config.ensure_dirs()?;

        let db = sled::Config::new()
            .path(&config.data_dir)
            .cache_capacity(config.cache_capacity)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        log::info!(
            "sled engine opened at {:?} ({} keys, cache={} bytes)",
            config.data_dir,
            db.len(),
            config.cache_capacity
        );

        Ok(Self {
            db,
            sync_writes: config.sync_writes,
        })
    }

    fn sync(&self) -> Result<()> {
        if self.sync_writes {
            self.db.flush()?;
        }
        Ok(())
    }
}

impl Backend for SledBackend {
    fn name(&self) -> &str {
        "sled"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: Value) -> Result<()> {
        self.db.insert(key, value)?;
        self.sync()
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.remove(key)?;
        self.sync()
    }

    fn scan_prefix(&self, prefix: &[u8]) -> ScanIter<'_> {
        Box::new(self.db.scan_prefix(prefix).map(|item| -> Result<(Key, Value)> {
            let (k, v) = item?;
            Ok((k.to_vec(), v.to_vec()))
        }))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut staged = sled::Batch::default();
        for mutation in batch {
            match mutation.value {
                Some(value) => staged.insert(mutation.key, value),
                None => staged.remove(mutation.key),
            }
        }
        self.db.apply_batch(staged)?;
        self.sync()
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
