//! Event translator: raw notification events to semantic change events.

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::EventKind;
use std::path::Path;

use crate::event::{ChangeEvent, ChangeKind};
use crate::relpath;
use crate::watcher::registry::WatchRegistry;

/// Translate one raw notification into a semantic change event.
///
/// Returns `None` for event kinds outside the replicated set and for paths
/// whose parent directory is not registered (either outside the tree or a
/// race against a concurrent delete); both are dropped silently.
///
/// Command precedence: close-after-write on a non-directory or any create
/// kind maps to CREATE, remove kinds to DELETE, and the two rename halves to
/// MOVED_FROM and MOVED_TO. The inotify backend reports a completed rename
/// three times (the From half, the To half, and a combined Both event); the
/// combined form is dropped here so each half goes out exactly once.
///
/// Side effects on the registry: a created directory is registered (with its
/// whole subtree) before the event is returned, so mutations inside it are
/// observable immediately; a deleted or moved-away directory has its
/// mappings dropped.
pub fn translate(registry: &mut WatchRegistry, raw: &notify::Event) -> Option<ChangeEvent> {
    let path = raw.paths.first()?;
    let rel = resolve_relative(registry, path)?;

    match raw.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            // Content finalized; always a file
            Some(ChangeEvent::new(ChangeKind::Create, rel, false))
        }
        EventKind::Create(create_kind) => {
            let is_dir = match create_kind {
                CreateKind::Folder => true,
                CreateKind::File => false,
                _ => path.is_dir(),
            };
            if is_dir {
                registry.register_tree(path, &rel);
            }
            Some(ChangeEvent::new(ChangeKind::Create, rel, is_dir))
        }
        EventKind::Remove(remove_kind) => {
            let is_dir = match remove_kind {
                RemoveKind::Folder => true,
                RemoveKind::File => false,
                // Self-removal of a watched directory arrives as Other after
                // the parent watch already reported it; drop the duplicate.
                RemoveKind::Other => return None,
                RemoveKind::Any => registry.is_registered_dir(path),
            };
            if is_dir {
                registry.forget_subtree(path);
            }
            Some(ChangeEvent::new(ChangeKind::Delete, rel, is_dir))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            let is_dir = registry.is_registered_dir(path);
            if is_dir {
                registry.forget_subtree(path);
            }
            Some(ChangeEvent::new(ChangeKind::MovedFrom, rel, is_dir))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            Some(ChangeEvent::new(ChangeKind::MovedTo, rel, path.is_dir()))
        }
        // Combined rename event, already covered by its From and To halves
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
        _ => None,
    }
}

/// Build the normalized relative path for an event target: the parent
/// directory's registered relative path joined with the final component.
fn resolve_relative(registry: &WatchRegistry, path: &Path) -> Option<String> {
    let parent = path.parent()?;
    let dir_rel = registry.dir_relative(parent)?;
    let name = path.file_name()?.to_string_lossy();
    Some(relpath::normalize(&relpath::join(dir_rel, &name)))
}
