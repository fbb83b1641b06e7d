//! Watch registrar: per-directory notification watches and the mapping
//! needed to turn raw event paths back into sync-relative paths.
//!
//! Every directory under the sync root gets its own non-recursive watch.
//! The watched absolute path doubles as the watch handle (it is the key the
//! notification backend uses for watch and unwatch), and the registry maps
//! it to the directory's relative path.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::relpath;

/// Growable registry of watched directories.
///
/// One mapping per watched directory. Mappings are added at startup, on
/// CREATE of a directory, and during snapshot scans; they are dropped when a
/// registered directory is deleted or moved away, because registry
/// membership is also how MOVED_FROM and DELETE targets are classified as
/// directories (the notification backend does not report dir-ness for paths
/// that no longer exist).
pub struct WatchRegistry {
    watcher: RecommendedWatcher,
    mappings: HashMap<PathBuf, String>,
    root: PathBuf,
}

impl WatchRegistry {
    pub fn new(root: PathBuf, watcher: RecommendedWatcher) -> Self {
        Self {
            watcher,
            mappings: HashMap::new(),
            root,
        }
    }

    /// Absolute path of the sync root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register a watch on `abs_root` and every directory below it.
    ///
    /// `rel_base` is the relative path of `abs_root` itself (empty for the
    /// sync root). A directory that cannot be read or watched (e.g. removed
    /// mid-walk) is skipped with a warning; the walk continues.
    pub fn register_tree(&mut self, abs_root: &Path, rel_base: &str) {
        for entry in WalkDir::new(abs_root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    eprintln!("Warning: skipping unreadable entry during watch registration: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let suffix = match entry.path().strip_prefix(abs_root) {
                Ok(suffix) => suffix,
                Err(_) => continue,
            };
            let rel = if suffix.as_os_str().is_empty() {
                rel_base.to_string()
            } else {
                relpath::join(rel_base, &suffix.to_string_lossy())
            };
            self.register_dir(entry.path(), &rel);
        }
    }

    /// Register a single directory watch and record its mapping.
    ///
    /// Returns false if the watch could not be established; the caller
    /// carries on without it.
    pub fn register_dir(&mut self, abs: &Path, rel: &str) -> bool {
        if self.mappings.contains_key(abs) {
            return true;
        }
        match self.watcher.watch(abs, RecursiveMode::NonRecursive) {
            Ok(()) => {
                self.mappings
                    .insert(abs.to_path_buf(), relpath::normalize(rel));
                true
            }
            Err(e) => {
                eprintln!("Warning: failed to watch {}: {}", abs.display(), e);
                false
            }
        }
    }

    /// Look up the relative path of a watched directory (handle -> path).
    pub fn dir_relative(&self, abs_dir: &Path) -> Option<&str> {
        self.mappings.get(abs_dir).map(String::as_str)
    }

    /// Whether `abs` is a registered directory. Used to classify DELETE and
    /// MOVED_FROM targets, which no longer exist on disk.
    pub fn is_registered_dir(&self, abs: &Path) -> bool {
        self.mappings.contains_key(abs)
    }

    /// Drop the mappings for a directory and everything below it, after the
    /// directory was deleted or moved out of the tree. The kernel-side watch
    /// on a deleted directory is reclaimed by the OS; for a moved-away
    /// directory the watch follows the inode, and dropping the mapping here
    /// makes any events it still produces unresolvable, so they are ignored.
    pub fn forget_subtree(&mut self, abs: &Path) {
        self.mappings.retain(|path, _| !path.starts_with(abs));
    }

    /// Number of watched directories.
    pub fn watch_count(&self) -> usize {
        self.mappings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_registry(root: &Path) -> WatchRegistry {
        let watcher = notify::recommended_watcher(|_| {}).unwrap();
        WatchRegistry::new(root.to_path_buf(), watcher)
    }

    #[test]
    fn test_register_tree_maps_all_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir(root.join("c")).unwrap();
        fs::write(root.join("a/file.txt"), b"x").unwrap();

        let mut registry = test_registry(&root);
        registry.register_tree(&root, "");

        assert_eq!(registry.watch_count(), 4);
        assert_eq!(registry.dir_relative(&root), Some(""));
        assert_eq!(registry.dir_relative(&root.join("a")), Some("a"));
        assert_eq!(registry.dir_relative(&root.join("a/b")), Some("a/b"));
        assert_eq!(registry.dir_relative(&root.join("c")), Some("c"));
        // Files are not registered
        assert!(!registry.is_registered_dir(&root.join("a/file.txt")));
    }

    #[test]
    fn test_register_tree_with_relative_base() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("moved/inner")).unwrap();

        let mut registry = test_registry(&root);
        registry.register_tree(&root.join("moved"), "moved");

        assert_eq!(registry.dir_relative(&root.join("moved")), Some("moved"));
        assert_eq!(
            registry.dir_relative(&root.join("moved/inner")),
            Some("moved/inner")
        );
    }

    #[test]
    fn test_forget_subtree_drops_descendants() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir(root.join("ab")).unwrap();

        let mut registry = test_registry(&root);
        registry.register_tree(&root, "");
        registry.forget_subtree(&root.join("a"));

        assert!(!registry.is_registered_dir(&root.join("a")));
        assert!(!registry.is_registered_dir(&root.join("a/b")));
        // Prefix match is per component; "ab" survives
        assert!(registry.is_registered_dir(&root.join("ab")));
        assert!(registry.is_registered_dir(&root));
    }

    #[test]
    fn test_register_missing_directory_is_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();

        let mut registry = test_registry(&root);
        assert!(!registry.register_dir(&root.join("nonexistent"), "nonexistent"));
        assert_eq!(registry.watch_count(), 0);
    }
}
