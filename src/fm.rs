//! `Fm`: the filesystem manager. Tracks the visible column chain (parent,
//! current, preview), the paste buffer, marks, and delegates selection to
//! `selection.rs`.
//!
//! Grounded on `fm.c`/`fm.h`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    Copy,
    Move,
}

#[derive(Debug, Default)]
pub struct PasteBuffer {
    pub mode: Option<PasteMode>,
    pub paths: Vec<PathBuf>,
}

impl PasteBuffer {
    pub fn set(&mut self, mode: PasteMode, paths: Vec<PathBuf>) {
        self.mode = Some(mode);
        self.paths = paths;
    }

    pub fn clear(&mut self) {
        self.mode = None;
        self.paths.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

pub struct Fm {
    pub cwd: PathBuf,
    pub selection: Selection,
    pub paste: PasteBuffer,
    /// Mark name -> path. `'` is set automatically on every chdir, as in
    /// the original (`fm_chdir`'s automark).
    marks: HashMap<char, PathBuf>,
    /// The most recently requested async chdir target, if one is still in
    /// flight. `request_chdir` sets this; the `ChdirResult` handler only
    /// commits if the result's target still matches it, discarding a stale
    /// result from a chdir that was superseded before it landed.
    pub pending_chdir_target: Option<PathBuf>,
}

impl Fm {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            selection: Selection::new(),
            paste: PasteBuffer::default(),
            marks: HashMap::new(),
            pending_chdir_target: None,
        }
    }

    /// The chain of ancestor directories from root down to (but not
    /// including) `cwd`, used to render the parent columns.
    pub fn visible_columns(&self) -> Vec<PathBuf> {
        let mut chain: Vec<PathBuf> = self.cwd.ancestors().skip(1).map(Path::to_path_buf).collect();
        chain.reverse();
        chain
    }

    /// Commit a directory change: automark the previous cwd under `'`,
    /// then update `cwd`. The caller is responsible for triggering the
    /// actual load (sync or async) through the engine.
    pub fn chdir(&mut self, new_cwd: PathBuf) {
        self.set_mark('\'', self.cwd.clone());
        self.cwd = new_cwd;
    }

    pub fn set_mark(&mut self, name: char, path: PathBuf) {
        self.marks.insert(name, path);
    }

    pub fn mark(&self, name: char) -> Option<&PathBuf> {
        self.marks.get(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chdir_automarks_previous_cwd() {
        let mut fm = Fm::new(PathBuf::from("/home/user"));
        fm.chdir(PathBuf::from("/home/user/projects"));
        assert_eq!(fm.mark('\''), Some(&PathBuf::from("/home/user")));
        assert_eq!(fm.cwd, PathBuf::from("/home/user/projects"));
    }

    #[test]
    fn visible_columns_excludes_cwd_itself() {
        let fm = Fm::new(PathBuf::from("/a/b/c"));
        let columns = fm.visible_columns();
        assert!(!columns.contains(&PathBuf::from("/a/b/c")));
        assert_eq!(columns.last(), Some(&PathBuf::from("/a/b")));
    }

    #[test]
    fn paste_buffer_tracks_mode_and_paths() {
        let mut buf = PasteBuffer::default();
        buf.set(PasteMode::Move, vec![PathBuf::from("/x")]);
        assert_eq!(buf.mode, Some(PasteMode::Move));
        assert!(!buf.is_empty());
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.mode, None);
    }
}
