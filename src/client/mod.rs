//! Follower: connects to a sync server and replicates its update stream
//! into a local directory.

pub mod applier;

pub use applier::{PendingMove, UpdateApplier, MOVE_CORRELATION_WINDOW};

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::protocol::Update;

/// Follower configuration.
#[derive(Debug, Clone)]
pub struct FollowConfig {
    /// Local directory receiving the replica
    pub root: PathBuf,
    /// Server address, `host:port`
    pub server: String,
    /// Comma-separated extension ignore list sent at handshake
    pub ignore_list: String,
}

/// Read an ignore-list file: whitespace-separated extensions, joined with
/// commas for the handshake message.
pub fn read_ignore_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read ignore file {}", path.display()))?;
    Ok(content.split_whitespace().collect::<Vec<_>>().join(","))
}

/// Connect, hand over the ignore list, and apply updates until the server
/// closes the connection or `shutdown` is set.
pub fn run(config: &FollowConfig, shutdown: Arc<AtomicBool>) -> Result<()> {
    let root = std::fs::canonicalize(&config.root)
        .with_context(|| format!("cannot open sync root {}", config.root.display()))?;

    let mut stream = TcpStream::connect(&config.server)
        .with_context(|| format!("cannot connect to {}", config.server))?;
    stream
        .write_all(config.ignore_list.as_bytes())
        .context("failed to send ignore list")?;

    println!("Connected to {}. Syncing into {}", config.server, root.display());

    let applier = UpdateApplier::new(root.clone());
    let monitor = applier::spawn_monitor(root, applier.pending(), Arc::clone(&shutdown));

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                println!("Server closed the connection");
                break;
            }
            Ok(_) => match Update::parse(&line) {
                Ok(update) => {
                    if let Err(e) = applier.apply(&update, &mut reader) {
                        eprintln!("Connection lost mid-transfer: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    // Desync is per message; resume at the next line
                    eprintln!("Dropping malformed update ({}): {}", e, line.trim_end());
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    let _ = monitor.join();
    Ok(())
}
