//! Treecast: one-way directory tree replication over TCP
//!
//! A server watches a directory tree through the host's change-notification
//! mechanism and streams every mutation to connected followers, which apply
//! the same mutations to their own copy of the tree. Followers submit a
//! per-connection ignore list of file extensions at handshake time and
//! receive only the events that pass their filter.
//!
//! # Pipeline
//!
//! Raw notification -> event translation (watch registry lookup, new-watch
//! registration) -> broadcast dispatch (per-client filtering, file content
//! framing) -> wire -> follower decoding -> local filesystem mutation.
//!
//! Renames inside the tree arrive as a MOVED_FROM / MOVED_TO pair; the
//! follower correlates them within a one-second window and falls back to
//! delete (unmatched MOVED_FROM) or create (unmatched MOVED_TO). A whole
//! directory moved in from outside the tree is expanded server-side into a
//! snapshot of synthetic creation events.

pub mod client;
pub mod event;
pub mod filter;
pub mod protocol;
pub mod relpath;
pub mod server;
pub mod version;
pub mod watcher;

pub use client::applier::{
    resolve_expired, spawn_monitor, PendingMove, UpdateApplier, MONITOR_INTERVAL,
    MOVE_CORRELATION_WINDOW,
};
pub use client::{read_ignore_file, FollowConfig};
pub use event::{ChangeEvent, ChangeKind};
pub use filter::IgnoreFilter;
pub use protocol::{ProtocolError, Update};
pub use relpath::RelPathError;
pub use server::session::HANDSHAKE_BUF_LEN;
pub use server::{ServeConfig, SessionRegistry, SyncServer};
pub use watcher::{translate, TreeWatcher, WatchRegistry};
