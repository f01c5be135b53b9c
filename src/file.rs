//! A single directory entry and the metadata the engine tracks for it.
//!
//! Mirrors the original `File` struct: a fast, `readdir`-only record is
//! produced first, then enriched in a background pass (`fileinfo`, see
//! `worker.rs`) that fills in `lstat`/`stat`/`link_target` for symlinks and
//! `filecount` for directories.

use std::ffi::OsStr;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    /// Display name. Equal to `path.file_name()` except for entries folded
    /// in from a deeper level by a flattened load, where it carries the
    /// partial relative path (see `dir::flatten`).
    pub name: String,
    pub ext: Option<String>,
    pub lstat: Option<Metadata>,
    /// `Some` only once the background stat pass resolves the symlink.
    pub stat: Option<Metadata>,
    pub link_target: Option<PathBuf>,
    /// True if `link_target` points nowhere, or the entry itself disappeared
    /// before the fast listing could even lstat it.
    pub broken: bool,
    /// Number of children, valid for directories once counted. `-1` means
    /// "not counted yet" (kept as an `Option` here rather than the sentinel).
    pub filecount: Option<u64>,
    /// True if `name` starts with `.`, or it was inherited from a hidden
    /// ancestor during a flattened load.
    pub hidden: bool,
}

impl File {
    /// Fast construction from a `readdir` entry: lstat only, no symlink
    /// resolution, no child count. This is what `dir_load` does on the
    /// listing pass before handing off to the fileinfo batcher.
    pub fn from_dir_entry(entry: &fs::DirEntry, hidden_override: Option<bool>) -> std::io::Result<Self> {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let lstat = entry.metadata().ok();
        let hidden = hidden_override.unwrap_or_else(|| name.starts_with('.'));
        let ext = Self::extension_of(&name);
        Ok(Self {
            path,
            name,
            ext,
            lstat,
            stat: None,
            link_target: None,
            broken: false,
            filecount: None,
            hidden,
        })
    }

    /// Construct a `File` directly from a known path, re-stating it. Used
    /// by the fileinfo batcher, which already knows which paths it wants
    /// to enrich and doesn't have a `fs::DirEntry` handy for them.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let lstat = fs::symlink_metadata(path)?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string_lossy().into_owned());
        let hidden = name.starts_with('.');
        let ext = Self::extension_of(&name);
        Ok(Self {
            path: path.to_path_buf(),
            name,
            ext,
            lstat: Some(lstat),
            stat: None,
            link_target: None,
            broken: false,
            filecount: None,
            hidden,
        })
    }

    fn extension_of(name: &str) -> Option<String> {
        Path::new(name)
            .extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase())
    }

    pub fn is_dir(&self) -> bool {
        match &self.stat {
            Some(st) => st.is_dir(),
            None => self.lstat.as_ref().is_some_and(Metadata::is_dir),
        }
    }

    pub fn is_link(&self) -> bool {
        self.lstat.as_ref().is_some_and(Metadata::is_symlink)
    }

    pub fn size(&self) -> u64 {
        self.stat.as_ref().or(self.lstat.as_ref()).map(Metadata::len).unwrap_or(0)
    }

    pub fn mtime(&self) -> Option<SystemTime> {
        self.lstat.as_ref().and_then(|m| m.modified().ok())
    }

    pub fn atime(&self) -> Option<SystemTime> {
        self.lstat.as_ref().and_then(|m| m.accessed().ok())
    }

    pub fn ctime(&self) -> Option<SystemTime> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            self.lstat.as_ref().map(|m| {
                SystemTime::UNIX_EPOCH + std::time::Duration::new(m.ctime().max(0) as u64, m.ctime_nsec().max(0) as u32)
            })
        }
        #[cfg(not(unix))]
        {
            self.mtime()
        }
    }

    /// Resolve symlink target and stat it. Run from the fileinfo batcher on
    /// a worker thread, never on the main thread.
    pub fn resolve_link(&mut self) {
        if !self.is_link() {
            return;
        }
        match fs::read_link(&self.path) {
            Ok(target) => {
                let resolved = if target.is_relative() {
                    self.path.parent().map(|p| p.join(&target)).unwrap_or(target.clone())
                } else {
                    target.clone()
                };
                match fs::metadata(&resolved) {
                    Ok(stat) => {
                        self.stat = Some(stat);
                        self.link_target = Some(target);
                        self.broken = false;
                    }
                    Err(_) => {
                        self.link_target = Some(target);
                        self.broken = true;
                    }
                }
            }
            Err(_) => self.broken = true,
        }
    }

    /// Count immediate children; `None` on error (permission denied, etc).
    pub fn count_children(path: &Path) -> Option<u64> {
        fs::read_dir(path).ok().map(|rd| rd.count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    #[test]
    fn hidden_name_detected() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join(".hidden"), b"x").unwrap();
        let entry = stdfs::read_dir(dir.path()).unwrap().next().unwrap().unwrap();
        let f = File::from_dir_entry(&entry, None).unwrap();
        assert!(f.hidden);
        assert_eq!(f.name, ".hidden");
    }

    #[test]
    fn extension_lowercased() {
        assert_eq!(File::extension_of("Foo.TXT").as_deref(), Some("txt"));
        assert_eq!(File::extension_of("noext"), None);
    }

    #[test]
    fn broken_symlink_marked() {
        #[cfg(unix)]
        {
            let dir = tempfile::tempdir().unwrap();
            let link = dir.path().join("dangling");
            std::os::unix::fs::symlink(dir.path().join("nope"), &link).unwrap();
            let entry = stdfs::read_dir(dir.path()).unwrap().next().unwrap().unwrap();
            let mut f = File::from_dir_entry(&entry, None).unwrap();
            f.resolve_link();
            assert!(f.broken);
        }
    }
}
