//! Wire protocol between server and followers.
//!
//! Updates travel as single text lines, except file creation which appends a
//! raw byte payload after its header:
//!
//! ```text
//! CREATE DIR <relative_path>\n
//! CREATE FILE <relative_path> <byte_length>\n   (followed by exactly byte_length raw bytes)
//! DELETE DIR|FILE <relative_path>\n
//! MOVED_FROM DIR|FILE <relative_path>\n
//! MOVED_TO DIR|FILE <relative_path>\n
//! ```
//!
//! The payload is framed purely by the declared length; a zero-length header
//! still signals an empty-file creation. Paths use `/` separators. A path
//! containing whitespace breaks the token format; that limitation is part of
//! the protocol.

use serde::{Deserialize, Serialize};

/// Error types for header-line parsing.
///
/// A parse failure is not fatal to a session: the decoder drops the line and
/// resumes at the next one.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Header line carried no tokens
    #[error("empty message line")]
    Empty,

    /// First token is not a known command word
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Known command but missing or invalid fields
    #[error("malformed header: {0}")]
    Malformed(String),

    /// Entry tag was neither `DIR` nor `FILE`
    #[error("invalid entry tag: {0}")]
    InvalidTag(String),

    /// CREATE FILE length field did not parse as an unsigned integer
    #[error("invalid byte length: {0}")]
    InvalidLength(String),
}

/// One decoded server-to-follower update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Update {
    /// Directory created (or synthesized by a snapshot scan)
    CreateDir { path: String },
    /// File created; `len` raw content bytes follow the header
    CreateFile { path: String, len: u64 },
    /// Item deleted; the tag decides file vs recursive directory removal
    Delete { path: String, is_dir: bool },
    /// Item moved away; opens the move-correlation window
    MovedFrom { path: String, is_dir: bool },
    /// Item moved in; pairs with a pending MOVED_FROM or falls back to create
    MovedTo { path: String, is_dir: bool },
}

fn entry_tag(is_dir: bool) -> &'static str {
    if is_dir {
        "DIR"
    } else {
        "FILE"
    }
}

fn parse_tag(tag: &str) -> Result<bool, ProtocolError> {
    match tag {
        "DIR" => Ok(true),
        "FILE" => Ok(false),
        other => Err(ProtocolError::InvalidTag(other.to_string())),
    }
}

impl Update {
    /// Encode the header line, including the trailing newline.
    pub fn header(&self) -> String {
        match self {
            Update::CreateDir { path } => format!("CREATE DIR {}\n", path),
            Update::CreateFile { path, len } => format!("CREATE FILE {} {}\n", path, len),
            Update::Delete { path, is_dir } => {
                format!("DELETE {} {}\n", entry_tag(*is_dir), path)
            }
            Update::MovedFrom { path, is_dir } => {
                format!("MOVED_FROM {} {}\n", entry_tag(*is_dir), path)
            }
            Update::MovedTo { path, is_dir } => {
                format!("MOVED_TO {} {}\n", entry_tag(*is_dir), path)
            }
        }
    }

    /// The relative path this update addresses.
    pub fn path(&self) -> &str {
        match self {
            Update::CreateDir { path }
            | Update::CreateFile { path, .. }
            | Update::Delete { path, .. }
            | Update::MovedFrom { path, .. }
            | Update::MovedTo { path, .. } => path,
        }
    }

    /// Parse a header line. Trailing newline or carriage return is tolerated;
    /// extra tokens after the expected fields are ignored.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut tokens = line.split_whitespace();

        let command = tokens.next().ok_or(ProtocolError::Empty)?;
        match command {
            "CREATE" => {
                let tag = tokens
                    .next()
                    .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
                let is_dir = parse_tag(tag)?;
                let path = tokens
                    .next()
                    .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?
                    .to_string();
                if is_dir {
                    Ok(Update::CreateDir { path })
                } else {
                    let len_token = tokens
                        .next()
                        .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
                    let len = len_token
                        .parse::<u64>()
                        .map_err(|_| ProtocolError::InvalidLength(len_token.to_string()))?;
                    Ok(Update::CreateFile { path, len })
                }
            }
            "DELETE" | "MOVED_FROM" | "MOVED_TO" => {
                let tag = tokens
                    .next()
                    .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
                let is_dir = parse_tag(tag)?;
                let path = tokens
                    .next()
                    .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?
                    .to_string();
                Ok(match command {
                    "DELETE" => Update::Delete { path, is_dir },
                    "MOVED_FROM" => Update::MovedFrom { path, is_dir },
                    _ => Update::MovedTo { path, is_dir },
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let updates = [
            Update::CreateDir {
                path: "assets".to_string(),
            },
            Update::CreateFile {
                path: "notes.txt".to_string(),
                len: 5,
            },
            Update::Delete {
                path: "assets".to_string(),
                is_dir: true,
            },
            Update::MovedFrom {
                path: "a.txt".to_string(),
                is_dir: false,
            },
            Update::MovedTo {
                path: "b.txt".to_string(),
                is_dir: false,
            },
        ];

        for update in updates {
            let parsed = Update::parse(&update.header()).unwrap();
            assert_eq!(update, parsed);
        }
    }

    #[test]
    fn test_exact_header_format() {
        let header = Update::CreateFile {
            path: "notes.txt".to_string(),
            len: 5,
        }
        .header();
        assert_eq!(header, "CREATE FILE notes.txt 5\n");

        let header = Update::MovedFrom {
            path: "a.txt".to_string(),
            is_dir: false,
        }
        .header();
        assert_eq!(header, "MOVED_FROM FILE a.txt\n");
    }

    #[test]
    fn test_zero_length_file_header() {
        let header = Update::CreateFile {
            path: "empty".to_string(),
            len: 0,
        }
        .header();
        assert_eq!(header, "CREATE FILE empty 0\n");
        assert_eq!(
            Update::parse(&header).unwrap(),
            Update::CreateFile {
                path: "empty".to_string(),
                len: 0,
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(matches!(
            Update::parse("FROBNICATE FILE x\n"),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_length() {
        // CREATE FILE without a length field is dropped, not treated as empty
        assert!(matches!(
            Update::parse("CREATE FILE notes.txt\n"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_tag() {
        assert!(matches!(
            Update::parse("DELETE SYMLINK x\n"),
            Err(ProtocolError::InvalidTag(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(matches!(
            Update::parse("CREATE FILE notes.txt five\n"),
            Err(ProtocolError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_parse_empty_line() {
        assert!(matches!(Update::parse("\n"), Err(ProtocolError::Empty)));
        assert!(matches!(Update::parse(""), Err(ProtocolError::Empty)));
    }
}
