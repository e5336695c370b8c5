//! CANOPY - Hierarchical TTL Key-Value Store
//!
//! An overlay that turns an ordered, byte-oriented embedded engine into a
//! hierarchical key-value store with per-entry expiry, prefix ("tree")
//! reads and deletes, and atomic batches.
//!
//! ## Features
//! - **Paths**: keys are segment lists joined with `:` (`users:alice:email`)
//! - **TTL**: every value carries an 8-byte absolute expiry header
//! - **Logical clock**: advanced by a background keeper thread, read atomically
//! - **Sweeps**: periodic best-effort removal of expired entries
//! - **Batches**: staged sets and deletes committed atomically
//! - **Engines**: persistent sled backend or a volatile in-memory map
//!
//! ## Example
//! ```no_run
//! use canopy::{Config, Store};
//! use std::time::Duration;
//!
//! let store = Store::open(Config::new("./data")).unwrap();
//!
//! store.set(&["users", "alice"], b"admin").unwrap();
//! store.set_with_ttl(&["sessions", "1"], b"token", Duration::from_secs(30)).unwrap();
//!
//! let mut batch = store.new_batch();
//! batch.set(&["users", "bob"], b"guest").unwrap();
//! batch.delete(&["sessions", "1"]).unwrap();
//! batch.write().unwrap();
//!
//! assert_eq!(store.get_tree(&["users"]).unwrap().len(), 2);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{CanopyError, Result};
pub use store::batch::Batch;
pub use store::Store;
pub use types::Entry;
