//! Per-client ignore filter over file extensions.
//!
//! Each follower submits a comma-separated extension list at handshake time
//! (e.g. `.mp4,.zip`). An event is suppressed for that client iff the final
//! extension of the path exactly matches one entry. No wildcards, no case
//! folding.

/// Predicate over relative paths, derived from one client's ignore list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreFilter {
    extensions: Vec<String>,
}

impl IgnoreFilter {
    /// Parse a comma-separated extension list.
    ///
    /// Entries are kept verbatim (including the leading dot); surrounding
    /// whitespace is trimmed and empty entries dropped, so `".mp4, .zip,"`
    /// parses the same as `".mp4,.zip"`.
    pub fn parse(list: &str) -> Self {
        let extensions = list
            .split(',')
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { extensions }
    }

    /// Whether an event for `rel_path` should be suppressed for this client.
    ///
    /// The extension is the substring after the last `.` in the final path
    /// component, including the dot. A path with no dot in its final
    /// component never matches.
    pub fn should_skip(&self, rel_path: &str) -> bool {
        if self.extensions.is_empty() {
            return false;
        }
        let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
        let Some(dot) = file_name.rfind('.') else {
            return false;
        };
        let ext = &file_name[dot..];
        self.extensions.iter().any(|entry| entry == ext)
    }

    /// True when this filter suppresses nothing.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_match() {
        let filter = IgnoreFilter::parse(".mp4,.zip");
        assert!(filter.should_skip("clip.mp4"));
        assert!(filter.should_skip("archive.zip"));
        assert!(!filter.should_skip("notes.txt"));
    }

    #[test]
    fn test_exact_match_only() {
        let filter = IgnoreFilter::parse(".mp4");
        // No suffix or case-insensitive matching
        assert!(!filter.should_skip("clip.MP4"));
        assert!(!filter.should_skip("clip.mp42"));
        assert!(!filter.should_skip("mp4"));
    }

    #[test]
    fn test_final_component_extension() {
        let filter = IgnoreFilter::parse(".zip");
        assert!(filter.should_skip("nested/dir/archive.zip"));
        // Dot in a directory component is not an extension
        assert!(!filter.should_skip("bundle.zip/readme"));
    }

    #[test]
    fn test_no_extension_never_matches() {
        let filter = IgnoreFilter::parse(".mp4,.zip");
        assert!(!filter.should_skip("Makefile"));
        assert!(!filter.should_skip("dir/Makefile"));
    }

    #[test]
    fn test_empty_filter_skips_nothing() {
        let filter = IgnoreFilter::default();
        assert!(!filter.should_skip("clip.mp4"));
        assert!(IgnoreFilter::parse("").is_empty());
        assert!(IgnoreFilter::parse(" , ,").is_empty());
    }

    #[test]
    fn test_whitespace_tolerant_parse() {
        let filter = IgnoreFilter::parse(" .mp4 , .zip ");
        assert!(filter.should_skip("a.mp4"));
        assert!(filter.should_skip("b.zip"));
    }
}
