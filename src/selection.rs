//! Entry selection, including visual-range mode.
//!
//! Grounded on `fm.c`'s selection handling: a plain set of selected paths,
//! plus an optional visual-range mode that remembers an anchor and a
//! snapshot of what was selected before the range started. Leaving visual
//! mode must never unselect anything that was already selected coming in
//! (P8) — only entries the range itself added can be toggled back off by
//! re-entering them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct Selection {
    selected: HashSet<PathBuf>,
    visual: Option<VisualRange>,
}

#[derive(Debug)]
struct VisualRange {
    anchor: PathBuf,
    /// Selection contents at the moment visual mode was entered. Members
    /// of this snapshot are never removed while exiting visual mode.
    snapshot: HashSet<PathBuf>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        self.selected.contains(path)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.selected.iter()
    }

    /// Toggle a single entry. A no-op inside an active visual range — use
    /// `extend_visual_to` there instead.
    pub fn toggle(&mut self, path: &Path) {
        if self.selected.contains(path) {
            self.selected.remove(path);
        } else {
            self.selected.insert(path.to_path_buf());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.visual = None;
    }

    pub fn enter_visual(&mut self, anchor: &Path) {
        self.visual = Some(VisualRange { anchor: anchor.to_path_buf(), snapshot: self.selected.clone() });
    }

    pub fn in_visual(&self) -> bool {
        self.visual.is_some()
    }

    /// Recompute the selection for an active visual range given the
    /// current cursor position: everything between `anchor` and `cursor`
    /// (inclusive, by index in `ordered_paths`) is selected in addition to
    /// the snapshot; entries outside that range fall back to whatever the
    /// snapshot said.
    pub fn extend_visual_to(&mut self, cursor: &Path, ordered_paths: &[PathBuf]) {
        let Some(visual) = &self.visual else { return };
        let Some(anchor_idx) = ordered_paths.iter().position(|p| p == &visual.anchor) else { return };
        let Some(cursor_idx) = ordered_paths.iter().position(|p| p == cursor) else { return };
        let (lo, hi) = if anchor_idx <= cursor_idx { (anchor_idx, cursor_idx) } else { (cursor_idx, anchor_idx) };

        self.selected = visual.snapshot.clone();
        for path in &ordered_paths[lo..=hi] {
            self.selected.insert(path.clone());
        }
    }

    /// Exit visual mode. The snapshot members stay selected regardless of
    /// whether the range currently covers them (P8); only entries the
    /// range added beyond the snapshot remain selected as picked up by the
    /// last `extend_visual_to` call.
    pub fn exit_visual(&mut self) {
        self.visual = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn p7_toggle_is_idempotent_pair() {
        let mut sel = Selection::new();
        let p = PathBuf::from("/a");
        sel.toggle(&p);
        assert!(sel.is_selected(&p));
        sel.toggle(&p);
        assert!(!sel.is_selected(&p));
    }

    #[test]
    fn p8_exiting_visual_keeps_presnapshot_members() {
        let ordered = paths(&["/a", "/b", "/c", "/d"]);
        let mut sel = Selection::new();
        sel.toggle(&PathBuf::from("/a")); // pre-existing selection
        sel.enter_visual(&PathBuf::from("/c"));
        sel.extend_visual_to(Path::new("/d"), &ordered);
        assert!(sel.is_selected(Path::new("/a")));
        assert!(sel.is_selected(Path::new("/c")));
        assert!(sel.is_selected(Path::new("/d")));
        sel.exit_visual();
        assert!(sel.is_selected(Path::new("/a")));
    }

    #[test]
    fn visual_range_shrinks_when_cursor_moves_back() {
        let ordered = paths(&["/a", "/b", "/c", "/d"]);
        let mut sel = Selection::new();
        sel.enter_visual(&PathBuf::from("/a"));
        sel.extend_visual_to(Path::new("/d"), &ordered);
        assert!(sel.is_selected(Path::new("/d")));
        sel.extend_visual_to(Path::new("/b"), &ordered);
        assert!(!sel.is_selected(Path::new("/d")));
        assert!(sel.is_selected(Path::new("/b")));
    }
}
