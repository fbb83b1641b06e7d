//! Sync server: watches one directory tree and streams its mutations to
//! connected followers.
//!
//! All server state lives in this context (watch registry, session
//! registry, sync root); there are no process-wide globals, so multiple
//! independent servers can coexist in one process.

pub mod broadcast;
pub mod session;

pub use session::SessionRegistry;

use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::watcher::{translate, TreeWatcher};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Directory tree to replicate
    pub root: PathBuf,
    /// TCP port to listen on (0 picks an ephemeral port)
    pub port: u16,
    /// Maximum number of concurrently connected followers
    pub max_clients: usize,
}

/// A bound but not yet running sync server.
pub struct SyncServer {
    listener: TcpListener,
    watcher: TreeWatcher,
    sessions: Arc<SessionRegistry>,
}

impl SyncServer {
    /// Watch the sync root and bind the listening socket.
    ///
    /// Failures here (unreadable root, port in use) are startup errors and
    /// terminate the process; everything after `run` starts is survivable.
    pub fn bind(config: &ServeConfig) -> Result<Self> {
        let watcher = TreeWatcher::new(&config.root)?;
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port))
            .with_context(|| format!("cannot listen on port {}", config.port))?;
        // The accept loop polls so it can observe the shutdown flag
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            watcher,
            sessions: Arc::new(SessionRegistry::new(config.max_clients)),
        })
    }

    /// The address actually bound, which resolves port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of watched directories, fixed at bind time plus any
    /// registered since.
    pub fn watch_count(&self) -> usize {
        self.watcher.registry().watch_count()
    }

    /// Run the event pipeline and the accept loop until `shutdown` is set.
    ///
    /// The event pipeline runs on its own thread: raw notification ->
    /// translation -> dispatch, strictly sequentially, so event order within
    /// one watched directory is preserved. The accept loop runs here.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<()> {
        let SyncServer {
            listener,
            mut watcher,
            sessions,
        } = self;

        let pump_sessions = Arc::clone(&sessions);
        let pump_shutdown = Arc::clone(&shutdown);
        let pump = thread::spawn(move || {
            event_loop(&mut watcher, &pump_sessions, &pump_shutdown);
        });

        while !shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    // The accepted socket must block; only the listener polls
                    if let Err(e) = stream.set_nonblocking(false) {
                        eprintln!("Failed to configure connection from {}: {}", peer, e);
                        continue;
                    }
                    Arc::clone(&sessions).accept(stream, peer);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    eprintln!("Accept failed: {}", e);
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }

        let _ = pump.join();
        Ok(())
    }
}

/// Drain raw notifications, translate, dispatch. One event at a time.
fn event_loop(watcher: &mut TreeWatcher, sessions: &SessionRegistry, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        match watcher.recv_raw_timeout(Duration::from_millis(100)) {
            Ok(Some(raw)) => {
                if let Some(event) = translate(watcher.registry_mut(), &raw) {
                    broadcast::dispatch(watcher.registry_mut(), sessions, &event);
                }
            }
            Ok(None) => break, // notification backend gone
            Err(()) => continue, // timeout; re-check the flag
        }
    }
}
