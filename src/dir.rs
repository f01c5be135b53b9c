//! The directory model: `Dir` holds the unfiltered listing, the filtered
//! view, cursor state, and enough bookkeeping to support update-merges and
//! flattened (multi-level) loads.
//!
//! Grounded on `dir.h`/`dir.c`. Three parallel views are kept, exactly as
//! in the original:
//!   - `files_all`: every entry from the last load, unsorted.
//!   - `files_sorted`: `files_all` sorted per `SortSettings`.
//!   - `files`: `files_sorted` with the active `Filter` applied.
//! `files` is always a subsequence of `files_sorted`, which is a
//! permutation of `files_all` (property P1 in the design ledger).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::file::File;
use crate::filter::Filter;
use crate::sort::{sort_files, SortSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
}

#[derive(Debug)]
pub struct Dir {
    pub path: PathBuf,
    pub name: String,
    files_all: Vec<File>,
    files_sorted: Vec<File>,
    files: Vec<File>,
    /// Index into `files` (the filtered view). `None` when `files` is empty.
    ind: Option<usize>,
    /// Scroll offset of the topmost visible row, maintained by the UI layer
    /// but carried here so update-merges can preserve it.
    pub pos: usize,
    pub sort: SortSettings,
    pub filter: Option<Filter>,
    pub state: LoadState,
    pub load_time: Option<SystemTime>,
    /// Name a pending cursor move should resolve to once the load that's
    /// currently in flight lands (`dir_cursor_move_to` queued against a
    /// load in progress).
    pub sel: Option<String>,
    /// 0 = no flattening, N = fold in directories up to N levels deep.
    pub flatten_level: u32,
    /// Bumped each time an `update_with` merge lands; the fileinfo batcher
    /// drops a batch whose captured value disagrees with the current one
    /// (see the load-bearing rule documented in the design ledger).
    pub updates: u64,
    pub watched: bool,
}

impl Dir {
    pub fn empty(path: PathBuf) -> Self {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            name,
            files_all: Vec::new(),
            files_sorted: Vec::new(),
            files: Vec::new(),
            ind: None,
            pos: 0,
            sort: SortSettings::default(),
            filter: None,
            state: LoadState::Loading,
            load_time: None,
            sel: None,
            flatten_level: 0,
            updates: 0,
            watched: false,
        }
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn files_sorted(&self) -> &[File] {
        &self.files_sorted
    }

    pub fn files_all(&self) -> &[File] {
        &self.files_all
    }

    pub fn length(&self) -> usize {
        self.files.len()
    }

    pub fn length_sorted(&self) -> usize {
        self.files_sorted.len()
    }

    pub fn length_all(&self) -> usize {
        self.files_all.len()
    }

    pub fn cursor_index(&self) -> Option<usize> {
        self.ind
    }

    pub fn cursor_file(&self) -> Option<&File> {
        self.ind.and_then(|i| self.files.get(i))
    }

    /// Plain, non-flattened read of a directory: one `readdir` pass, fast
    /// lstat only (no symlink resolution, no child counts — those land via
    /// the fileinfo batcher). Every entry is read into `files_all`,
    /// hidden or not — hidden-skipping is a `files` (filtered-view)
    /// concern handled by `apply_filter`, never a `readdir`-time one, so
    /// toggling `sort.hidden` can reveal entries with a pure in-memory
    /// re-filter and no reload.
    pub fn load_flat(path: &Path, flatten_level: u32) -> std::io::Result<Vec<File>> {
        if flatten_level == 0 {
            return Self::load_single_level(path);
        }
        Self::load_flattened(path, flatten_level)
    }

    fn load_single_level(path: &Path) -> std::io::Result<Vec<File>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let f = File::from_dir_entry(&entry, None)?;
            out.push(f);
        }
        Ok(out)
    }

    /// BFS walk up to `flatten_level` deep. Nested entries get their
    /// display `name` rewritten to the path relative to `path`, matching
    /// `dir_load_flat`'s pointer-shift trick (there it slides a pointer
    /// into the full path buffer; here we just build the relative string).
    /// Hidden-ness is inherited: a child under a hidden ancestor is hidden
    /// even if its own name doesn't start with `.`. The walk itself never
    /// skips hidden entries or hidden subdirectories — every entry up to
    /// `max_level` lands in the result regardless of hidden status.
    fn load_flattened(root: &Path, max_level: u32) -> std::io::Result<Vec<File>> {
        let mut out = Vec::new();
        let mut queue: VecDeque<(PathBuf, u32, bool)> = VecDeque::new();
        queue.push_back((root.to_path_buf(), 0, false));

        while let Some((dir, level, ancestor_hidden)) = queue.pop_front() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(rd) => rd,
                Err(_) => continue,
            };
            for entry in entries {
                let entry = match entry {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                let own_hidden = entry.file_name().to_string_lossy().starts_with('.');
                let hidden = ancestor_hidden || own_hidden;
                let mut f = File::from_dir_entry(&entry, Some(hidden))?;
                if level > 0 {
                    let rel = f.path.strip_prefix(root).unwrap_or(&f.path);
                    f.name = rel.to_string_lossy().into_owned();
                }
                let is_dir = f.is_dir();
                let child_path = f.path.clone();
                out.push(f);
                if is_dir && level < max_level {
                    queue.push_back((child_path, level + 1, hidden));
                }
            }
        }
        Ok(out)
    }

    /// Replace `files_all`, re-sort, re-filter, and move the cursor to a
    /// sensible resting place (by name if one was staged in `sel`,
    /// otherwise clamp the existing index).
    pub fn set_files(&mut self, files: Vec<File>, load_time: SystemTime) {
        self.files_all = files;
        self.state = LoadState::Loaded;
        self.load_time = Some(load_time);
        self.resort();
        if let Some(name) = self.sel.take() {
            self.cursor_move_to_name(&name, 0, 0);
        } else {
            self.clamp_cursor();
        }
    }

    pub fn resort(&mut self) {
        let cursor_name = self.cursor_file().map(|f| f.name.clone());
        self.files_sorted = self.files_all.clone();
        sort_files(&mut self.files_sorted, self.sort, seed_from_path(&self.path));
        self.apply_filter();
        if let Some(name) = cursor_name {
            self.cursor_move_to_name(&name, 0, 0);
        } else {
            self.clamp_cursor();
        }
    }

    /// Derive `files` from `files_sorted`: drop hidden entries unless
    /// `self.sort.hidden` says to show them, then apply the active
    /// `Filter` on top. Both checks run here, in memory, so toggling
    /// either one never needs a reload.
    pub fn apply_filter(&mut self) {
        let show_hidden = self.sort.hidden;
        self.files = self
            .files_sorted
            .iter()
            .filter(|f| show_hidden || !f.hidden)
            .filter(|f| match &self.filter {
                Some(filter) if !filter.is_empty() => filter.matches(f),
                _ => true,
            })
            .cloned()
            .collect();
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        if self.files.is_empty() {
            self.ind = None;
        } else {
            let clamped = self.ind.unwrap_or(0).min(self.files.len() - 1);
            self.ind = Some(clamped);
        }
    }

    /// Move the cursor by `delta` rows, then slide `pos` (the scroll
    /// offset) so the cursor stays at least `scrolloff` rows from either
    /// edge of a `viewport_height`-row window, matching the original's
    /// `dir_cursor_move` + scrolloff handling in `ui.c`. Pass
    /// `viewport_height == 0` to skip the scroll adjustment entirely (used
    /// by internal callers that only care about `ind`).
    pub fn cursor_move(&mut self, delta: i64, viewport_height: usize, scrolloff: usize) {
        let Some(cur) = self.ind else { return };
        if self.files.is_empty() {
            self.ind = None;
            return;
        }
        let new = (cur as i64 + delta).clamp(0, self.files.len() as i64 - 1);
        self.ind = Some(new as usize);
        self.adjust_pos_for_scrolloff(viewport_height, scrolloff);
    }

    pub fn cursor_move_to_name(&mut self, name: &str, viewport_height: usize, scrolloff: usize) {
        if let Some(i) = self.files.iter().position(|f| f.name == name) {
            self.ind = Some(i);
        } else {
            self.clamp_cursor();
        }
        self.adjust_pos_for_scrolloff(viewport_height, scrolloff);
    }

    /// Keep `pos` (the scroll offset of the topmost visible row) such that
    /// the cursor is never closer than `scrolloff` rows from the top or
    /// bottom edge of a `viewport_height`-row window, unless the listing
    /// itself is too short for that margin to fit.
    fn adjust_pos_for_scrolloff(&mut self, viewport_height: usize, scrolloff: usize) {
        let Some(ind) = self.ind else { return };
        if viewport_height == 0 {
            return;
        }
        let len = self.files.len();
        let max_pos = len.saturating_sub(viewport_height);
        let margin = scrolloff.min(viewport_height.saturating_sub(1) / 2);

        if ind < self.pos + margin {
            self.pos = ind.saturating_sub(margin);
        } else if ind + margin >= self.pos + viewport_height {
            self.pos = ind + margin + 1 - viewport_height;
        }
        self.pos = self.pos.min(max_pos);
    }

    /// Merge a freshly-loaded replacement directory into `self`, preserving
    /// cursor identity by name where possible (P6). Mirrors `dir_update_with`:
    /// the caller's `Dir` handle stays stable; only its contents change.
    pub fn update_with(&mut self, mut replacement: Dir) {
        let cursor_name = self.cursor_file().map(|f| f.name.clone());
        self.files_all = std::mem::take(&mut replacement.files_all);
        self.files_sorted = std::mem::take(&mut replacement.files_sorted);
        self.files = std::mem::take(&mut replacement.files);
        self.state = replacement.state;
        self.load_time = replacement.load_time;
        self.updates += 1;
        if let Some(name) = cursor_name {
            self.cursor_move_to_name(&name);
        } else {
            self.clamp_cursor();
        }
    }

    /// Compare `load_time` against the directory's current on-disk mtime.
    /// A change means the listing is stale and a reload should be
    /// scheduled; matches `dir_check`'s inode/mtime comparison, simplified
    /// to whole-second mtime only (see design ledger on sub-second mtimes).
    pub fn needs_reload(&self) -> bool {
        let Some(load_time) = self.load_time else { return true };
        match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime > load_time,
            Err(_) => true,
        }
    }
}

/// Stable per-path seed so a `Random` sort order doesn't reshuffle on every
/// unrelated resort of the same directory within a session.
fn seed_from_path(path: &Path) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_dir_with(entries: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for e in entries {
            fs::write(dir.path().join(e), b"x").unwrap();
        }
        dir
    }

    #[test]
    fn p1_files_is_permutation_subsequence() {
        let tmp = make_dir_with(&["b.txt", "a.txt", ".hidden"]);
        let files = Dir::load_flat(tmp.path(), 0).unwrap();
        assert_eq!(files.len(), 3, "readdir must capture hidden entries too");
        let mut d = Dir::empty(tmp.path().to_path_buf());
        d.set_files(files, SystemTime::now());
        assert_eq!(d.length_sorted(), d.length_all());
        assert!(d.length() <= d.length_sorted());
        // default sort.hidden = false, so the filtered view excludes `.hidden`
        // even though files_all/files_sorted both still carry it.
        assert_eq!(d.length(), 2);
        assert_eq!(d.length_all(), 3);
    }

    #[test]
    fn scenario1_toggling_hidden_reveals_entry_without_reload() {
        let tmp = make_dir_with(&["a.txt", "b.txt", "c.txt", ".h"]);
        let mut d = Dir::empty(tmp.path().to_path_buf());
        d.set_files(Dir::load_flat(tmp.path(), 0).unwrap(), SystemTime::now());
        assert_eq!(d.length_all(), 4);
        assert_eq!(d.length(), 3);
        assert!(!d.files().iter().any(|f| f.name == ".h"));

        d.sort.hidden = true;
        d.resort();
        assert_eq!(d.length(), 4);
        assert!(d.files().iter().any(|f| f.name == ".h"));
    }

    #[test]
    fn cursor_survives_resort_by_name() {
        let tmp = make_dir_with(&["a.txt", "b.txt", "c.txt"]);
        let files = Dir::load_flat(tmp.path(), 0).unwrap();
        let mut d = Dir::empty(tmp.path().to_path_buf());
        d.set_files(files, SystemTime::now());
        d.cursor_move_to_name("b.txt", 0, 0);
        assert_eq!(d.cursor_file().unwrap().name, "b.txt");
        d.sort.reverse = true;
        d.resort();
        assert_eq!(d.cursor_file().unwrap().name, "b.txt");
    }

    #[test]
    fn p6_update_with_preserves_cursor_identity() {
        let tmp = make_dir_with(&["a.txt", "b.txt"]);
        let files = Dir::load_flat(tmp.path(), 0).unwrap();
        let mut d = Dir::empty(tmp.path().to_path_buf());
        d.set_files(files, SystemTime::now());
        d.cursor_move_to_name("b.txt");

        fs::write(tmp.path().join("c.txt"), b"x").unwrap();
        let mut replacement = Dir::empty(tmp.path().to_path_buf());
        replacement.set_files(Dir::load_flat(tmp.path(), 0).unwrap(), SystemTime::now());

        d.update_with(replacement);
        assert_eq!(d.cursor_file().unwrap().name, "b.txt");
        assert_eq!(d.length_all(), 3);
    }

    #[test]
    fn flatten_nested_entries_get_relative_name() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/inner.txt"), b"x").unwrap();
        let files = Dir::load_flat(tmp.path(), 1).unwrap();
        let inner = files.iter().find(|f| f.path.ends_with("inner.txt")).unwrap();
        assert_eq!(inner.name, "sub/inner.txt");
    }

    #[test]
    fn hidden_ancestor_hides_children() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join(".hidden_dir")).unwrap();
        fs::write(tmp.path().join(".hidden_dir/inner.txt"), b"x").unwrap();
        let files = Dir::load_flat(tmp.path(), 1).unwrap();
        let inner = files.iter().find(|f| f.path.ends_with("inner.txt")).unwrap();
        assert!(inner.hidden);
    }

    #[test]
    fn p2_cursor_stays_in_bounds_after_filter() {
        let tmp = make_dir_with(&["alpha.txt", "beta.txt", "gamma.txt"]);
        let mut d = Dir::empty(tmp.path().to_path_buf());
        d.set_files(Dir::load_flat(tmp.path(), 0).unwrap(), SystemTime::now());
        d.cursor_move(2, 0, 0);
        d.filter = Some(Filter::Substring("alpha".into()));
        d.apply_filter();
        assert!(d.cursor_index().unwrap() < d.length());
    }

    #[test]
    fn scrolloff_keeps_cursor_off_the_viewport_edges() {
        let tmp = make_dir_with(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let mut d = Dir::empty(tmp.path().to_path_buf());
        d.set_files(Dir::load_flat(tmp.path(), 0).unwrap(), SystemTime::now());

        // viewport of 4 rows, scrolloff of 1: moving the cursor down to the
        // bottom of the listing must push `pos` to keep a 1-row margin.
        for _ in 0..9 {
            d.cursor_move(1, 4, 1);
        }
        assert_eq!(d.cursor_index(), Some(9));
        assert!(d.pos + 4 > d.cursor_index().unwrap());
        assert!(d.cursor_index().unwrap() + 1 >= d.pos + 4 - 1);

        for _ in 0..9 {
            d.cursor_move(-1, 4, 1);
        }
        assert_eq!(d.cursor_index(), Some(0));
        assert_eq!(d.pos, 0);
    }
}
