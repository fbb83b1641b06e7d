//! Broadcast dispatcher and snapshot scanner.
//!
//! The dispatcher turns one semantic change event into one wire frame and
//! fans it out through the session registry. File creations carry their
//! content: the file is read once per event and the frame shared across all
//! receiving sessions.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::event::{ChangeEvent, ChangeKind};
use crate::protocol::Update;
use crate::relpath;
use crate::server::session::SessionRegistry;
use crate::watcher::WatchRegistry;

/// Dispatch one change event to every non-ignoring session.
///
/// A MOVED_TO of a directory means the directory appeared atomically from
/// outside the tree, with no per-item notifications for its contents; it is
/// expanded into a snapshot of synthetic creations instead of a single
/// message.
pub fn dispatch(registry: &mut WatchRegistry, sessions: &SessionRegistry, event: &ChangeEvent) {
    let root = registry.root().to_path_buf();

    match event.kind {
        ChangeKind::MovedTo if event.is_dir => {
            snapshot_subtree(registry, sessions, &root.join(&event.rel_path), &event.rel_path);
        }
        ChangeKind::Create if !event.is_dir => {
            broadcast_file_creation(sessions, &root, &event.rel_path);
        }
        _ => {
            let update = match event.kind {
                ChangeKind::Create => Update::CreateDir {
                    path: event.rel_path.clone(),
                },
                ChangeKind::Delete => Update::Delete {
                    path: event.rel_path.clone(),
                    is_dir: event.is_dir,
                },
                ChangeKind::MovedFrom => Update::MovedFrom {
                    path: event.rel_path.clone(),
                    is_dir: event.is_dir,
                },
                ChangeKind::MovedTo => Update::MovedTo {
                    path: event.rel_path.clone(),
                    is_dir: event.is_dir,
                },
            };
            let frame: Arc<[u8]> = update.header().into_bytes().into();
            sessions.broadcast(&event.rel_path, &frame);
        }
    }
}

/// Encode and send a file-creation frame: header plus the file's current
/// content. A file that vanished between the notification and the read is
/// skipped; sync continues for everything else.
fn broadcast_file_creation(sessions: &SessionRegistry, root: &Path, rel: &str) {
    let abs = root.join(rel);
    let content = match fs::read(&abs) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Skipping {}: {}", abs.display(), e);
            return;
        }
    };

    let mut frame = Update::CreateFile {
        path: rel.to_string(),
        len: content.len() as u64,
    }
    .header()
    .into_bytes();
    frame.extend_from_slice(&content);

    let frame: Arc<[u8]> = frame.into();
    sessions.broadcast(rel, &frame);
}

/// Walk a subtree depth-first and broadcast synthetic CREATE events for
/// every item, registering a watch on each directory along the way. From a
/// follower's perspective the result is byte-identical to the subtree
/// having been created one item at a time.
pub fn snapshot_subtree(
    registry: &mut WatchRegistry,
    sessions: &SessionRegistry,
    abs_root: &Path,
    rel_root: &str,
) {
    let root = registry.root().to_path_buf();
    for entry in WalkDir::new(abs_root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                eprintln!("Warning: skipping unreadable entry during snapshot: {}", e);
                continue;
            }
        };

        let rel = match entry.path().strip_prefix(abs_root) {
            Ok(suffix) if suffix.as_os_str().is_empty() => rel_root.to_string(),
            Ok(suffix) => relpath::join(rel_root, &suffix.to_string_lossy()),
            Err(_) => continue,
        };
        let rel = relpath::normalize(&rel);

        if entry.file_type().is_dir() {
            let frame: Arc<[u8]> = Update::CreateDir { path: rel.clone() }
                .header()
                .into_bytes()
                .into();
            sessions.broadcast(&rel, &frame);
            registry.register_dir(entry.path(), &rel);
        } else {
            broadcast_file_creation(sessions, &root, &rel);
        }
    }
}
