//! Filesystem watching: registration, raw event intake, and translation.
//!
//! The notification backend delivers raw events on its own thread via a
//! callback; the callback forwards them over a channel to the server's
//! event loop, which owns translation and dispatch. Ordering within one
//! watched directory is preserved because the loop is the only consumer and
//! processes events sequentially.

pub mod registry;
pub mod translate;

pub use registry::WatchRegistry;
pub use translate::translate;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// Watcher over a sync root: the watch registry plus the raw event channel.
pub struct TreeWatcher {
    registry: WatchRegistry,
    raw_events: Receiver<notify::Event>,
}

impl TreeWatcher {
    /// Create a watcher for `root` and register the whole existing tree.
    ///
    /// Fails if the root cannot be resolved or the notification backend
    /// cannot be initialized; these are startup errors and fatal.
    pub fn new(root: &Path) -> Result<Self> {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("cannot open sync root {}", root.display()))?;

        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => eprintln!("Watch error: {}", e),
            }
        })?;

        let mut registry = WatchRegistry::new(root.clone(), watcher);
        registry.register_tree(&root, "");

        Ok(Self {
            registry,
            raw_events: rx,
        })
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WatchRegistry {
        &mut self.registry
    }

    /// Receive the next raw event with a timeout.
    ///
    /// # Returns
    /// - `Ok(Some(event))` if an event is available
    /// - `Ok(None)` if the notification backend has terminated
    /// - `Err(())` if the timeout elapsed
    pub fn recv_raw_timeout(&self, timeout: Duration) -> Result<Option<notify::Event>, ()> {
        match self.raw_events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Err(()),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    /// Try to receive a raw event without blocking.
    pub fn try_recv_raw(&self) -> Option<notify::Event> {
        self.raw_events.try_recv().ok()
    }
}
