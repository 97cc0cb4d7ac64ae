//! Line-oriented work lists
//!
//! One work item per line. Blank lines and lines starting with `#` are
//! skipped. A line may start with `@<priority>` (a level name or an integer)
//! to set its scheduling priority:
//!
//! ```text
//! # build first
//! @high cargo build
//! echo hello
//! ```
//!
//! Items are de-duplicated case-insensitively; the first occurrence wins.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use eyre::{Context, Result, eyre};
use serde::Serialize;
use tracing::debug;

use crate::domain::Priority;

/// A single work item read from a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    /// 1-based line number in the source
    pub line: usize,
    pub priority: Option<Priority>,
    pub text: String,
}

/// Parse work items from list content
pub fn parse_work_items(content: &str) -> Result<Vec<WorkItem>> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (priority, text) = match trimmed.strip_prefix('@') {
            Some(rest) => {
                let (level, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| eyre!("line {}: priority prefix without a work item", line))?;
                let priority = level.parse::<Priority>().map_err(|e| eyre!("line {}: {}", line, e))?;
                (Some(priority), text.trim())
            }
            None => (None, trimmed),
        };

        if !seen.insert(text.to_lowercase()) {
            debug!(line, %text, "parse_work_items: duplicate, skipping");
            continue;
        }

        items.push(WorkItem {
            line,
            priority,
            text: text.to_string(),
        });
    }

    Ok(items)
}

/// Read and parse a work list file
pub fn read_work_items<P: AsRef<Path>>(path: P) -> Result<Vec<WorkItem>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).context(format!("Failed to read work list {}", path.display()))?;
    let items = parse_work_items(&content).context(format!("Invalid work list {}", path.display()))?;
    debug!(path = %path.display(), count = items.len(), "read_work_items: loaded");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_skips_blank_and_comments() {
        let items = parse_work_items("\n# comment\n  echo a  \n\n   # indented comment\necho b\n").unwrap();
        let texts: Vec<_> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["echo a", "echo b"]);
        assert_eq!(items[0].line, 3);
        assert_eq!(items[1].line, 6);
    }

    #[test]
    fn test_priority_prefix() {
        let items = parse_work_items("@high make build\n@7 make test\nmake lint\n").unwrap();
        assert_eq!(items[0].priority, Some(Priority::HIGH));
        assert_eq!(items[0].text, "make build");
        assert_eq!(items[1].priority, Some(Priority::new(7)));
        assert_eq!(items[2].priority, None);
    }

    #[test]
    fn test_bad_priority_prefix() {
        let err = parse_work_items("echo ok\n@urgent echo no\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        assert!(parse_work_items("@high\n").is_err());
    }

    #[test]
    fn test_case_insensitive_dedup() {
        let items = parse_work_items("Apple\nbanana\napple\n@high APPLE\n").unwrap();
        let texts: Vec<_> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["Apple", "banana"]);
    }

    #[test]
    fn test_read_work_items() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "echo one\necho two").unwrap();

        let items = read_work_items(file.path()).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_work_items("/nonexistent/work.list").is_err());
    }
}
