//! CANOPY - Keeper
//! The per-store background thread. It advances the logical clock on every
//! tick and, once per sweep interval, launches an expiration sweep on its
//! own thread.
//!
//! ## Lifecycle
//! Running until the stop channel is signalled (or its sender dropped),
//! then Stopped. A stopped keeper cannot be restarted.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::Result;

use super::Shared;

/// Handle to a running keeper thread.
pub(crate) struct Keeper {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Keeper {
    /// Spawn the keeper for `shared`.
    pub(crate) fn start(
        shared: Arc<Shared>,
        tick: Duration,
        sweep_interval: Duration,
    ) -> Result<Self> {
        let (stop, stopped) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("canopy-keeper".to_string())
            .spawn(move || {
                let mut last_sweep = Instant::now();
                loop {
                    match stopped.recv_timeout(tick) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    shared.clock.tick();

                    if last_sweep.elapsed() >= sweep_interval {
                        last_sweep = Instant::now();
                        spawn_sweep(&shared);
                    }
                }
                log::debug!("keeper stopped");
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Signal the keeper and wait for it to exit. Later calls are no-ops.
    pub(crate) fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The keeper may already be gone; dropping the sender is enough.
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("keeper thread panicked");
            }
        }
    }
}

impl Drop for Keeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run a sweep without waiting for it. Its outcome is only logged.
fn spawn_sweep(shared: &Arc<Shared>) {
    let shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name("canopy-sweep".to_string())
        .spawn(move || match shared.sweep() {
            Ok(removed) => log::debug!("sweep removed {} expired entries", removed),
            Err(err) => log::warn!("sweep failed: {}", err),
        });

    if let Err(err) = spawned {
        log::warn!("could not start sweep: {}", err);
    }
}
