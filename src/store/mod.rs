//! CANOPY - Store
//! Hierarchical, TTL-aware key-value store layered over an ordered engine.
//!
//! ## Read path
//! path → engine key → raw envelope → expiry check against the logical
//! clock → stripped value. Expired values read as absent even before a
//! sweep removes them.
//!
//! ## Write path
//! path → engine key → envelope stamped with the logical clock → engine.

pub mod batch;
pub mod clock;
pub mod envelope;
mod keeper;
pub mod metrics;
pub mod path;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::engine::{Backend, SledBackend, WriteBatch};
use crate::error::{CanopyError, Result};
use crate::types::{Entry, Value};

use self::batch::Batch;
use self::clock::LogicalClock;
use self::keeper::Keeper;
use self::metrics::StoreMetrics;

/// State shared between a store and its background threads.
pub(crate) struct Shared {
    /// `None` once the store is closed.
    engine: RwLock<Option<Box<dyn Backend>>>,
    clock: LogicalClock,
    metrics: StoreMetrics,
}

impl Shared {
    /// Run `f` against the engine, or fail with `Closed`.
    fn with_engine<T>(&self, f: impl FnOnce(&dyn Backend) -> Result<T>) -> Result<T> {
        let guard = self.engine.read();
        let engine = guard.as_deref().ok_or(CanopyError::Closed)?;
        f(engine)
    }

    /// Delete every entry that is expired as of the sweep's start.
    fn sweep(&self) -> Result<usize> {
        self.with_engine(|engine| {
            let now = self.clock.now();
            let mut expired = WriteBatch::new();

            for item in engine.scan_prefix(&[]) {
                let (key, block) = item?;
                match envelope::header(&block) {
                    Ok(expires_at) if envelope::is_expired(expires_at, now) => expired.delete(key),
                    Ok(_) => {}
                    Err(err) => log::warn!(
                        "sweep skipped {:?}: {}",
                        String::from_utf8_lossy(&key),
                        err
                    ),
                }
            }

            let removed = expired.len();
            if removed > 0 {
                engine.write_batch(expired)?;
            }
            self.metrics.record_sweep(removed);
            Ok(removed)
        })
    }
}

/// A hierarchical key-value store with per-entry TTLs.
///
/// Paths are slices of segments (`&["users", "alice"]`); tree operations
/// take a prefix path and match every key that starts with it.
///
/// ## Example
/// ```no_run
/// use canopy::{Config, Store};
/// use std::time::Duration;
///
/// let store = Store::open(Config::new("./data")).unwrap();
/// store.set(&["users", "alice"], b"admin").unwrap();
/// store.set_with_ttl(&["sessions", "42"], b"token", Duration::from_secs(60)).unwrap();
///
/// assert_eq!(store.get(&["users", "alice"]).unwrap(), b"admin".to_vec());
/// assert_eq!(store.get_tree(&["users"]).unwrap().len(), 1);
/// store.close().unwrap();
/// ```
pub struct Store {
    shared: Arc<Shared>,
    /// On-disk location, `None` for volatile engines.
    path: Option<PathBuf>,
    open: AtomicBool,
    keeper: Mutex<Option<Keeper>>,
}

impl Store {
    /// Open or create a persistent store at `config.data_dir`.
    pub fn open(config: Config) -> Result<Self> {
        let engine = SledBackend::open(&config)?;
        Self::start(Box::new(engine), Some(config.data_dir.clone()), &config)
    }

    /// Open a store over an arbitrary engine. The store has no on-disk
    /// location of its own, so [`Store::remove`] only closes it.
    pub fn with_backend(engine: impl Backend + 'static, config: &Config) -> Result<Self> {
        Self::start(Box::new(engine), None, config)
    }

    fn start(engine: Box<dyn Backend>, path: Option<PathBuf>, config: &Config) -> Result<Self> {
        let name = engine.name().to_string();
        let shared = Arc::new(Shared {
            engine: RwLock::new(Some(engine)),
            clock: LogicalClock::new(),
            metrics: StoreMetrics::new(),
        });
        let keeper = Keeper::start(
            Arc::clone(&shared),
            config.tick_interval,
            config.sweep_interval,
        )?;

        log::info!(
            "canopy store opened ({} engine, tick={:?}, sweep every {:?})",
            name,
            config.tick_interval,
            config.sweep_interval
        );

        Ok(Self {
            shared,
            path,
            open: AtomicBool::new(true),
            keeper: Mutex::new(Some(keeper)),
        })
    }

    /// Location the store was opened from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns false once the store has been closed.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Operation counters for this store.
    pub fn metrics(&self) -> &StoreMetrics {
        &self.shared.metrics
    }

    /// Create an empty batch bound to this store.
    pub fn new_batch(&self) -> Batch<'_> {
        Batch::new(self)
    }

    /// Returns true if a live (unexpired) value exists at `path`.
    pub fn has<S: AsRef<str>>(&self, path: &[S]) -> Result<bool> {
        match self.get(path) {
            Ok(_) => Ok(true),
            Err(CanopyError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Get the value at `path`. Expired values are reported as `NotFound`.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Result<Value> {
        let key = path::join(path)?;
        let metrics = &self.shared.metrics;

        self.shared.with_engine(|engine| {
            let Some(block) = engine.get(&key)? else {
                metrics.record_get(None);
                return Err(CanopyError::NotFound);
            };

            let (expires_at, value) = envelope::decode(&block)?;
            if envelope::is_expired(expires_at, self.shared.clock.now()) {
                metrics.record_get(None);
                metrics.record_expired_read();
                return Err(CanopyError::NotFound);
            }

            metrics.record_get(Some(value.len()));
            Ok(value.to_vec())
        })
    }

    /// Set a value that never expires.
    pub fn set<S: AsRef<str>>(&self, path: &[S], value: &[u8]) -> Result<()> {
        self.set_with_ttl(path, value, Duration::ZERO)
    }

    /// Set a value that expires `ttl` from now. A zero TTL never expires.
    pub fn set_with_ttl<S: AsRef<str>>(&self, path: &[S], value: &[u8], ttl: Duration) -> Result<()> {
        let key = path::join(path)?;
        let block = envelope::encode(value, ttl, self.shared.clock.now());

        self.shared.with_engine(|engine| {
            let envelope_size = block.len();
            engine.put(&key, block)?;
            self.shared.metrics.record_set(key.len(), envelope_size);
            Ok(())
        })
    }

    /// Delete the value at `path`. Deleting an absent key is not an error.
    pub fn delete<S: AsRef<str>>(&self, path: &[S]) -> Result<()> {
        let key = path::join(path)?;
        self.shared.with_engine(|engine| {
            engine.delete(&key)?;
            self.shared.metrics.record_delete();
            Ok(())
        })
    }

    /// Values of every live entry under `prefix`, in key order.
    pub fn get_tree<S: AsRef<str>>(&self, prefix: &[S]) -> Result<Vec<Value>> {
        Ok(self
            .get_tree_entries(prefix)?
            .into_iter()
            .map(|entry| entry.value)
            .collect())
    }

    /// Keys and values of every live entry under `prefix`, in key order.
    /// Expired entries are skipped but left for the sweeper.
    pub fn get_tree_entries<S: AsRef<str>>(&self, prefix: &[S]) -> Result<Vec<Entry>> {
        let prefix = path::prefix(prefix)?;

        self.shared.with_engine(|engine| {
            self.shared.metrics.record_tree_scan();
            let now = self.shared.clock.now();
            let mut entries = Vec::new();

            for item in engine.scan_prefix(&prefix) {
                let (key, block) = item?;
                let (expires_at, value) = envelope::decode(&block)?;
                if !envelope::is_expired(expires_at, now) {
                    entries.push(Entry {
                        key,
                        value: value.to_vec(),
                    });
                }
            }
            Ok(entries)
        })
    }

    /// Delete every entry under `prefix`, expired or not, in one atomic
    /// write. Returns the number of keys removed.
    pub fn delete_tree<S: AsRef<str>>(&self, prefix: &[S]) -> Result<usize> {
        let prefix = path::prefix(prefix)?;

        self.shared.with_engine(|engine| {
            self.shared.metrics.record_tree_scan();
            let mut batch = WriteBatch::new();
            for item in engine.scan_prefix(&prefix) {
                let (key, _) = item?;
                batch.delete(key);
            }

            let removed = batch.len();
            if removed > 0 {
                engine.write_batch(batch)?;
            }
            Ok(removed)
        })
    }

    /// Run an expiration sweep now and return how many entries it removed.
    pub fn sweep(&self) -> Result<usize> {
        self.shared.sweep()
    }

    /// Stop the keeper and close the engine. Only the first call does any
    /// work; later calls return `Ok(())`.
    pub fn close(&self) -> Result<()> {
        if self
            .open
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        if let Some(mut keeper) = self.keeper.lock().take() {
            keeper.stop();
        }

        // Waits for in-flight operations and sweeps to release the engine.
        let engine = self.shared.engine.write().take();
        let flushed = match engine {
            Some(engine) => engine.flush(),
            None => Ok(()),
        };

        log::info!("canopy store closed ({:?})", self.path);
        flushed
    }

    /// Close the store and delete its on-disk location.
    pub fn remove(&self) -> Result<()> {
        self.close()?;

        if let Some(path) = &self.path {
            match std::fs::remove_dir_all(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
            log::info!("canopy store removed ({:?})", path);
        }
        Ok(())
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("failed to close canopy store: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryBackend, ScanIter};
    use std::thread;

    fn memory_store() -> Store {
        Store::with_backend(MemoryBackend::new(), &Config::default()).unwrap()
    }

    fn disk_full() -> CanopyError {
        CanopyError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }

    /// Engine whose batch commits always fail.
    struct RejectingBatches(MemoryBackend);

    impl Backend for RejectingBatches {
        fn name(&self) -> &str {
            "rejecting"
        }
        fn get(&self, key: &[u8]) -> Result<Option<Value>> {
            self.0.get(key)
        }
        fn put(&self, key: &[u8], value: Value) -> Result<()> {
            self.0.put(key, value)
        }
        fn delete(&self, key: &[u8]) -> Result<()> {
            self.0.delete(key)
        }
        fn scan_prefix(&self, prefix: &[u8]) -> ScanIter<'_> {
            self.0.scan_prefix(prefix)
        }
        fn write_batch(&self, _batch: WriteBatch) -> Result<()> {
            Err(disk_full())
        }
        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Engine that refuses every single-key write.
    struct RejectingWrites(MemoryBackend);

    impl Backend for RejectingWrites {
        fn name(&self) -> &str {
            "read-only"
        }
        fn get(&self, key: &[u8]) -> Result<Option<Value>> {
            self.0.get(key)
        }
        fn put(&self, _key: &[u8], _value: Value) -> Result<()> {
            Err(disk_full())
        }
        fn delete(&self, _key: &[u8]) -> Result<()> {
            Err(disk_full())
        }
        fn scan_prefix(&self, prefix: &[u8]) -> ScanIter<'_> {
            self.0.scan_prefix(prefix)
        }
        fn write_batch(&self, batch: WriteBatch) -> Result<()> {
            self.0.write_batch(batch)
        }
        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_set_get_round_trip() {
        let store = memory_store();
        let value = vec![0u8, 1, 2, 255, 254];
        store.set(&["a", "b"], &value).unwrap();
        assert_eq!(store.get(&["a", "b"]).unwrap(), value);
        assert!(store.has(&["a", "b"]).unwrap());
    }

    #[test]
    fn test_missing_key() {
        let store = memory_store();
        assert!(matches!(store.get(&["nope"]), Err(CanopyError::NotFound)));
        assert!(!store.has(&["nope"]).unwrap());
    }

    #[test]
    fn test_bad_keys_touch_nothing() {
        let store = memory_store();
        let none: [&str; 0] = [];

        assert!(matches!(store.set(&none, b"v"), Err(CanopyError::BadKey(_))));
        assert!(matches!(store.set(&[""], b"v"), Err(CanopyError::BadKey(_))));
        assert!(matches!(store.get(&none), Err(CanopyError::BadKey(_))));
        assert!(matches!(store.has(&[""]), Err(CanopyError::BadKey(_))));
        assert!(matches!(store.delete(&none), Err(CanopyError::BadKey(_))));
        assert!(matches!(store.get(&["a:b"]), Err(CanopyError::BadKey(_))));

        // Nothing reached the engine
        assert!(store.get_tree(&none).unwrap().is_empty());
    }

    #[test]
    fn test_ttl_expires_lazily() {
        let store = memory_store();
        store
            .set_with_ttl(&["session"], b"token", Duration::from_millis(50))
            .unwrap();
        assert_eq!(store.get(&["session"]).unwrap(), b"token".to_vec());

        thread::sleep(Duration::from_millis(150));

        assert!(!store.has(&["session"]).unwrap());
        assert!(matches!(store.get(&["session"]), Err(CanopyError::NotFound)));
        assert!(store.metrics().expired_reads.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_set_replaces_ttl() {
        let store = memory_store();
        store
            .set_with_ttl(&["k"], b"short", Duration::from_millis(20))
            .unwrap();
        store.set(&["k"], b"forever").unwrap();

        thread::sleep(Duration::from_millis(60));
        assert_eq!(store.get(&["k"]).unwrap(), b"forever".to_vec());
    }

    #[test]
    fn test_tree_skips_expired_without_deleting() {
        let store = memory_store();
        store.set(&["t", "1"], b"one").unwrap();
        store
            .set_with_ttl(&["t", "2"], b"two", Duration::from_millis(20))
            .unwrap();
        store.set(&["t", "3"], b"three").unwrap();

        thread::sleep(Duration::from_millis(80));

        let values = store.get_tree(&["t"]).unwrap();
        assert_eq!(values, vec![b"one".to_vec(), b"three".to_vec()]);

        // delete_tree still sees the expired entry
        assert_eq!(store.delete_tree(&["t"]).unwrap(), 3);
        assert!(store.get_tree(&["t"]).unwrap().is_empty());
    }

    #[test]
    fn test_tree_entries_carry_keys() {
        let store = memory_store();
        store.set(&["users", "bob"], b"2").unwrap();
        store.set(&["users", "alice"], b"1").unwrap();
        store.set(&["groups", "admin"], b"x").unwrap();

        let entries = store.get_tree_entries(&["users"]).unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key_str().into_owned()).collect();
        assert_eq!(keys, vec!["users:alice", "users:bob"]);
        assert_eq!(entries[0].value, b"1".to_vec());
    }

    #[test]
    fn test_delete_tree_empty_prefix_clears_everything() {
        let store = memory_store();
        let everything: [&str; 0] = [];
        store.set(&["users", "alice"], b"1").unwrap();
        store.set(&["users", "bob"], b"2").unwrap();
        store.set(&["groups", "admin"], b"3").unwrap();
        store
            .set_with_ttl(&["sessions", "42"], b"4", Duration::from_secs(60))
            .unwrap();
        store.set(&["solo"], b"5").unwrap();

        assert_eq!(store.delete_tree(&everything).unwrap(), 5);
        assert!(store.get_tree(&everything).unwrap().is_empty());
        assert!(!store.has(&["solo"]).unwrap());

        // Nothing left to remove
        assert_eq!(store.delete_tree(&everything).unwrap(), 0);
    }

    #[test]
    fn test_failed_writes_are_not_counted() {
        let store =
            Store::with_backend(RejectingWrites(MemoryBackend::new()), &Config::default()).unwrap();

        assert!(matches!(store.set(&["k"], b"v"), Err(CanopyError::Io(_))));
        assert!(matches!(store.delete(&["k"]), Err(CanopyError::Io(_))));

        let metrics = store.metrics();
        assert_eq!(metrics.sets.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.deletes.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.bytes_written.load(Ordering::Relaxed), 0);

        let mut batch = store.new_batch();
        batch.set(&["k"], b"v").unwrap();
        batch.write().unwrap();
        assert_eq!(store.get(&["k"]).unwrap(), b"v".to_vec());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = memory_store();
        store.set(&["keep"], b"1").unwrap();
        store
            .set_with_ttl(&["drop", "a"], b"2", Duration::from_millis(10))
            .unwrap();
        store
            .set_with_ttl(&["drop", "b"], b"3", Duration::from_millis(10))
            .unwrap();

        thread::sleep(Duration::from_millis(60));

        assert_eq!(store.sweep().unwrap(), 2);
        assert_eq!(store.sweep().unwrap(), 0);
        assert!(store.has(&["keep"]).unwrap());
        assert_eq!(store.metrics().swept_keys.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_keeper_launches_sweeps() {
        let config = Config::default().with_sweep_interval(Duration::from_millis(20));
        let store = Store::with_backend(MemoryBackend::new(), &config).unwrap();
        store
            .set_with_ttl(&["gone"], b"v", Duration::from_millis(5))
            .unwrap();

        thread::sleep(Duration::from_millis(300));

        assert!(store.metrics().sweeps.load(Ordering::Relaxed) >= 1);
        assert!(store.metrics().swept_keys.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_batch_commits_together() {
        let store = memory_store();
        store.set(&["old"], b"x").unwrap();

        let mut batch = store.new_batch();
        batch.set(&["b", "1"], b"1").unwrap();
        batch
            .set_with_ttl(&["b", "2"], b"2", Duration::from_secs(60))
            .unwrap();
        batch.delete(&["old"]).unwrap();
        assert_eq!(batch.len(), 3);

        assert!(!store.has(&["b", "1"]).unwrap());
        batch.write().unwrap();
        assert!(batch.is_empty());

        assert_eq!(store.get_tree(&["b"]).unwrap().len(), 2);
        assert!(!store.has(&["old"]).unwrap());

        // Reuse after write
        batch.delete(&["b", "1"]).unwrap();
        batch.write().unwrap();
        assert!(!store.has(&["b", "1"]).unwrap());
    }

    #[test]
    fn test_batch_rejects_bad_keys() {
        let store = memory_store();
        let mut batch = store.new_batch();
        assert!(matches!(batch.set(&[""], b"v"), Err(CanopyError::BadKey(_))));
        assert!(matches!(batch.delete(&["a:b"]), Err(CanopyError::BadKey(_))));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_failed_batch_leaves_store_untouched() {
        let store = Store::with_backend(
            RejectingBatches(MemoryBackend::new()),
            &Config::default(),
        )
        .unwrap();
        store.set(&["existing"], b"x").unwrap();

        let mut batch = store.new_batch();
        batch.set(&["new", "1"], b"1").unwrap();
        batch.set(&["new", "2"], b"2").unwrap();
        batch.delete(&["existing"]).unwrap();

        assert!(matches!(batch.write(), Err(CanopyError::Io(_))));
        assert!(batch.is_empty());
        assert!(store.get_tree(&["new"]).unwrap().is_empty());
        assert!(store.has(&["existing"]).unwrap());
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = memory_store();
        store.set(&["k"], b"v").unwrap();
        store.close().unwrap();
        assert!(!store.is_open());

        assert!(matches!(store.get(&["k"]), Err(CanopyError::Closed)));
        assert!(matches!(store.set(&["k"], b"v"), Err(CanopyError::Closed)));
        assert!(matches!(store.get_tree(&["k"]), Err(CanopyError::Closed)));
        assert!(matches!(store.sweep(), Err(CanopyError::Closed)));

        let mut batch = store.new_batch();
        batch.set(&["k"], b"v").unwrap();
        assert!(matches!(batch.write(), Err(CanopyError::Closed)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = memory_store();
        store.close().unwrap();
        store.close().unwrap();
        store.remove().unwrap();
    }

    #[test]
    fn test_concurrent_close() {
        let store = Arc::new(memory_store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.close())
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert!(!store.is_open());
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(memory_store());
        let handles: Vec<_> = (0..5)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = i.to_string();
                    store.set(&["w", id.as_str()], id.as_bytes()).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get_tree(&["w"]).unwrap().len(), 5);
    }
}
