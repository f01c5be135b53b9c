//! `DirCache` and `PreviewCache`: insertion-ordered maps keyed by path,
//! each carrying a [`VersionCounter`] that's bumped whenever the cache is
//! dropped wholesale. In-flight workers capture the counter's value at
//! submission (see `validity.rs`) and discard their result if it has moved
//! by the time they finish.
//!
//! Grounded on `dircache.h` (an insertion-ordered hashmap keyed by
//! `zsview`) — `indexmap::IndexMap` is the direct Rust equivalent, giving
//! the same "iterate in insertion order" guarantee the original gets from
//! its custom hashtable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::dir::Dir;
use crate::validity::VersionCounter;

pub struct DirCache {
    entries: IndexMap<PathBuf, Dir>,
    version: Arc<VersionCounter>,
}

impl DirCache {
    pub fn new() -> Self {
        Self { entries: IndexMap::new(), version: Arc::new(VersionCounter::new()) }
    }

    pub fn version(&self) -> Arc<VersionCounter> {
        self.version.clone()
    }

    pub fn get(&self, path: &Path) -> Option<&Dir> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Dir> {
        self.entries.get_mut(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, dir: Dir) {
        self.entries.insert(dir.path.clone(), dir);
    }

    pub fn remove(&mut self, path: &Path) -> Option<Dir> {
        self.entries.shift_remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Dir)> {
        self.entries.iter()
    }

    /// Drop every cached directory and bump the version so that any
    /// in-flight load/fileinfo job targeting a now-gone slot is recognized
    /// as stale when it completes (P5).
    pub fn drop_all(&mut self) {
        self.entries.clear();
        self.version.bump();
    }
}

impl Default for DirCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum Preview {
    Text { lines: Vec<String>, truncated: bool },
    Image { width: u32, height: u32, format: String },
    Binary,
    Directory,
    Error(String),
}

pub struct PreviewCache {
    entries: IndexMap<PathBuf, Preview>,
    version: Arc<VersionCounter>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self { entries: IndexMap::new(), version: Arc::new(VersionCounter::new()) }
    }

    pub fn version(&self) -> Arc<VersionCounter> {
        self.version.clone()
    }

    pub fn get(&self, path: &Path) -> Option<&Preview> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: PathBuf, preview: Preview) {
        self.entries.insert(path, preview);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn drop_all(&mut self) {
        self.entries.clear();
        self.version.bump();
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validity::ValidityCheck;

    #[test]
    fn p5_stale_version_after_drop_all() {
        let mut cache = DirCache::new();
        let check = ValidityCheck::capture(cache.version());
        assert!(check.is_valid());
        cache.drop_all();
        assert!(!check.is_valid());
    }

    #[test]
    fn insertion_order_preserved() {
        let mut cache = DirCache::new();
        cache.insert(Dir::empty(PathBuf::from("/z")));
        cache.insert(Dir::empty(PathBuf::from("/a")));
        let paths: Vec<_> = cache.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/z"), PathBuf::from("/a")]);
    }

    #[test]
    fn preview_cache_versions_independently_of_dir_cache() {
        let dirs = DirCache::new();
        let previews = PreviewCache::new();
        let dcheck = ValidityCheck::capture(dirs.version());
        let pcheck = ValidityCheck::capture(previews.version());
        dirs.version.bump();
        assert!(!dcheck.is_valid());
        assert!(pcheck.is_valid());
    }
}
