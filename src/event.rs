//! Semantic change events produced by the event translator.

use serde::{Deserialize, Serialize};

/// Kind of filesystem mutation, named after the wire command it becomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeKind {
    /// Item was created or its content was finalized (close-after-write)
    Create,
    /// Item was deleted
    Delete,
    /// Item was moved away from its watched parent
    MovedFrom,
    /// Item was moved into a watched parent
    MovedTo,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Create => write!(f, "CREATE"),
            ChangeKind::Delete => write!(f, "DELETE"),
            ChangeKind::MovedFrom => write!(f, "MOVED_FROM"),
            ChangeKind::MovedTo => write!(f, "MOVED_TO"),
        }
    }
}

/// A single translated filesystem mutation.
///
/// Transient: constructed by the translator, consumed by the dispatcher,
/// then discarded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened
    pub kind: ChangeKind,
    /// Path relative to the sync root, normalized (no trailing separator)
    pub rel_path: String,
    /// Whether the affected item is a directory
    pub is_dir: bool,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, rel_path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            kind,
            rel_path: rel_path.into(),
            is_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_display() {
        assert_eq!(ChangeKind::Create.to_string(), "CREATE");
        assert_eq!(ChangeKind::Delete.to_string(), "DELETE");
        assert_eq!(ChangeKind::MovedFrom.to_string(), "MOVED_FROM");
        assert_eq!(ChangeKind::MovedTo.to_string(), "MOVED_TO");
    }

    #[test]
    fn test_event_serialization() {
        let event = ChangeEvent::new(ChangeKind::Create, "assets/img.png", false);

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ChangeEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event, deserialized);
    }
}
