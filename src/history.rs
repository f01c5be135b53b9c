//! Append-only command/path history, persisted one entry per line.
//!
//! Supplemented feature: the distilled spec doesn't mention history at
//! all, but `history.c` is a small, self-contained part of the original
//! that a "complete" reimplementation of this engine would carry. Kept
//! intentionally simple — no dedup window beyond "don't repeat the
//! immediately preceding entry", matching `history_append`'s own check.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
    path: Option<PathBuf>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .map(|text| text.lines().map(String::from).collect())
            .unwrap_or_default();
        Self { entries, path: Some(path) }
    }

    /// Append `entry`, skipping if it repeats the immediately preceding one.
    pub fn append(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        if self.entries.last().map(|s| s.as_str()) == Some(entry.as_str()) {
            return;
        }
        if let Some(path) = &self.path {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{entry}");
            }
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_skips_immediate_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = History::load(dir.path().join("hist"));
        h.append("cd /tmp");
        h.append("cd /tmp");
        assert_eq!(h.entries().len(), 1);
    }

    #[test]
    fn persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hist");
        let mut h = History::load(file.clone());
        h.append("one");
        h.append("two");
        let reloaded = History::load(file);
        assert_eq!(reloaded.entries(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn non_adjacent_repeat_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = History::load(dir.path().join("hist"));
        h.append("one");
        h.append("two");
        h.append("one");
        assert_eq!(h.entries().len(), 3);
    }
}
