//! Client update applier: decodes the update stream and mutates the local
//! replica, including move correlation.
//!
//! Move correlation holds a single pending slot: the most recent MOVED_FROM
//! waits for a matching MOVED_TO. A MOVED_TO inside the correlation window
//! becomes a rename; if none arrives, the monitor resolves the pending move
//! as a deletion (the item left the watched tree entirely). A second
//! MOVED_FROM before resolution overwrites the first; concurrent in-flight
//! moves are not distinguished.

use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::protocol::Update;
use crate::relpath;

/// How long a MOVED_FROM stays pending before it is resolved as a deletion.
pub const MOVE_CORRELATION_WINDOW: Duration = Duration::from_secs(1);

/// How often the monitor checks the pending slot.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(1);

/// The single outstanding move-away, waiting for its other half.
#[derive(Debug, Clone)]
pub struct PendingMove {
    /// Old relative path, already normalized
    pub rel_path: String,
    /// When the MOVED_FROM was observed
    pub since: Instant,
}

/// Applies decoded updates to the local sync root.
pub struct UpdateApplier {
    root: PathBuf,
    pending: Arc<Mutex<Option<PendingMove>>>,
}

impl UpdateApplier {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared handle to the pending-move slot, for the monitor thread.
    pub fn pending(&self) -> Arc<Mutex<Option<PendingMove>>> {
        Arc::clone(&self.pending)
    }

    /// Apply one update. `stream` supplies the raw content bytes of a
    /// CREATE FILE update, which follow its header on the wire.
    ///
    /// Local filesystem failures are reported and swallowed so that sync
    /// continues; only stream errors (the connection died mid-payload) are
    /// returned, and they end the session.
    pub fn apply<R: BufRead>(&self, update: &Update, stream: &mut R) -> io::Result<()> {
        let rel = relpath::normalize(update.path());
        if let Err(e) = relpath::validate(&rel) {
            eprintln!("Dropping update with unsafe path ({})", e);
            if let Update::CreateFile { len, .. } = update {
                // Stay in sync with the stream: the payload is on the wire
                // whether or not the path was acceptable.
                discard_exact(stream, *len)?;
            }
            return Ok(());
        }
        let abs = self.root.join(&rel);

        match update {
            Update::CreateDir { .. } => {
                if let Err(e) = fs::create_dir_all(&abs) {
                    eprintln!("Failed to create directory {}: {}", abs.display(), e);
                } else {
                    println!("Directory created: {}", rel);
                }
            }
            Update::CreateFile { len, .. } => {
                self.apply_file_creation(&rel, &abs, *len, stream)?;
            }
            Update::Delete { is_dir, .. } => {
                // The tag is authoritative: the server decides file vs
                // directory semantics, the client does not re-derive them.
                let result = if *is_dir {
                    fs::remove_dir_all(&abs)
                } else {
                    fs::remove_file(&abs)
                };
                match result {
                    Ok(()) => println!("Deleted: {}", rel),
                    // Already absent is fine; deletions are idempotent
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => eprintln!("Failed to delete {}: {}", abs.display(), e),
                }
            }
            Update::MovedFrom { .. } => {
                let mut pending = self.pending.lock().unwrap();
                // Only the most recent move-away is tracked
                *pending = Some(PendingMove {
                    rel_path: rel,
                    since: Instant::now(),
                });
            }
            Update::MovedTo { is_dir, .. } => {
                let taken = self.pending.lock().unwrap().take();
                match taken {
                    Some(pending_move) => {
                        let old_abs = self.root.join(&pending_move.rel_path);
                        ensure_parent(&abs);
                        match fs::rename(&old_abs, &abs) {
                            Ok(()) => println!("Renamed: {} -> {}", pending_move.rel_path, rel),
                            Err(e) => eprintln!(
                                "Failed to rename {} -> {}: {}",
                                old_abs.display(),
                                abs.display(),
                                e
                            ),
                        }
                    }
                    None => {
                        // Correlation miss: the item came from outside the
                        // server's tree, so materialize it fresh.
                        if *is_dir {
                            if let Err(e) = fs::create_dir_all(&abs) {
                                eprintln!("Failed to create directory {}: {}", abs.display(), e);
                            } else {
                                println!("Directory created (via move): {}", rel);
                            }
                        } else {
                            ensure_parent(&abs);
                            match fs::File::create(&abs) {
                                Ok(_) => println!("Empty file created (via move): {}", rel),
                                Err(e) => {
                                    eprintln!("Failed to create {}: {}", abs.display(), e)
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Read exactly `len` content bytes and write them as the file's full
    /// content. Whatever arrived before a mid-payload disconnect is still
    /// written, then the error is surfaced to end the session.
    fn apply_file_creation<R: BufRead>(
        &self,
        rel: &str,
        abs: &Path,
        len: u64,
        stream: &mut R,
    ) -> io::Result<()> {
        let mut content = Vec::with_capacity(len as usize);
        stream.by_ref().take(len).read_to_end(&mut content)?;
        let received = content.len() as u64;

        ensure_parent(abs);
        if let Err(e) = fs::write(abs, &content) {
            eprintln!("Failed to write {}: {}", abs.display(), e);
        } else {
            println!("File created: {} ({} bytes)", rel, received);
        }

        if received < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed after {} of {} bytes", received, len),
            ));
        }
        Ok(())
    }
}

/// Create the missing parent directories implied by a path.
fn ensure_parent(abs: &Path) {
    if let Some(parent) = abs.parent() {
        let _ = fs::create_dir_all(parent);
    }
}

/// Consume and discard exactly `len` bytes from the stream.
fn discard_exact<R: BufRead>(stream: &mut R, len: u64) -> io::Result<()> {
    let discarded = io::copy(&mut stream.by_ref().take(len), &mut io::sink())?;
    if discarded < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed inside discarded payload",
        ));
    }
    Ok(())
}

/// Resolve the pending move as a deletion if its correlation window has
/// elapsed. Returns the old relative path when a deletion happened.
///
/// Shared by the monitor thread and tests; the slot mutex serializes this
/// against the stream reader.
pub fn resolve_expired(
    root: &Path,
    pending: &Mutex<Option<PendingMove>>,
    window: Duration,
) -> Option<String> {
    let mut slot = pending.lock().unwrap();
    match slot.as_ref() {
        Some(pending_move) if pending_move.since.elapsed() >= window => {}
        _ => return None,
    }

    let pending_move = slot.take()?;
    let abs = root.join(&pending_move.rel_path);
    let result = if abs.is_dir() {
        fs::remove_dir_all(&abs)
    } else {
        fs::remove_file(&abs)
    };
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("Failed to delete {}: {}", abs.display(), e),
    }
    Some(pending_move.rel_path)
}

/// Spawn the move-timeout monitor.
///
/// Once per interval it resolves an expired pending move as a deletion.
/// Both the monitor and the stream reader mutate the slot, so all access
/// goes through its mutex.
pub fn spawn_monitor(
    root: PathBuf,
    pending: Arc<Mutex<Option<PendingMove>>>,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            thread::sleep(MONITOR_INTERVAL);
            if let Some(rel) = resolve_expired(&root, &pending, MOVE_CORRELATION_WINDOW) {
                println!("Deleted (move timed out): {}", rel);
            }
        }
    })
}
