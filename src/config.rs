//! CANOPY - Store Configuration
//! Defines the tunables handed to the store and its engine at open time.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a canopy store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for the engine's data files.
    pub data_dir: PathBuf,

    /// How often the keeper advances the logical clock.
    pub tick_interval: Duration,

    /// How often the keeper launches an expiration sweep.
    pub sweep_interval: Duration,

    /// Engine page cache size in bytes.
    pub cache_capacity: u64,

    /// Background flush period of the engine, `None` disables it.
    pub flush_every_ms: Option<u64>,

    /// Whether to flush the engine to disk after every mutation.
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            tick_interval: Duration::from_millis(1),
            sweep_interval: Duration::from_secs(60 * 60),
            cache_capacity: 64 * 1024 * 1024, // 64 MB
            flush_every_ms: Some(500),
            sync_writes: false,
        }
    }
}

impl Config {
    /// Create a new Config with a custom data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the keeper tick.
    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    /// Set the period between expiration sweeps.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the engine page cache size.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Set the engine's background flush period, `None` to disable it.
    pub fn with_flush_every_ms(mut self, period: Option<u64>) -> Self {
        self.flush_every_ms = period;
        self
    }

    /// Flush to disk after every write.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
