//! Engine-wide tunables — reload throttling, scrolloff, default sort, and
//! the inotify prefix blacklist.
//!
//! Persisted as TOML under `$XDG_CONFIG_HOME/dir-engine/config.toml`
//! (falling back to `~/.config/dir-engine/config.toml`), the way the
//! teacher's `AppConfig` round-trips its own settings file.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sort::SortSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum gap between successive reloads of the same directory.
    pub inotify_timeout_ms: u64,
    /// Small quiet period before a reload actually fires.
    pub inotify_delay_ms: u64,
    /// Rows kept between the cursor and the viewport edge when possible.
    pub scrolloff: u16,
    /// Delay before the "loading" indicator is shown for a slow load.
    pub loading_indicator_delay_ms: u64,
    /// Debounce window for preview loads while the cursor is moving fast.
    pub cursor_resting_delay_ms: u64,
    /// Path prefixes that never get an inotify watcher.
    pub inotify_blacklist: Vec<String>,
    /// Default sort applied to newly created directories.
    pub default_sort: SortSettings,
    /// Override for the worker pool size; `None` means `num_cpus + 1`.
    pub worker_threads: Option<usize>,
    /// File extensions (lowercase, no dot) routed to the image previewer.
    pub image_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inotify_timeout_ms: 1000,
            inotify_delay_ms: 50,
            scrolloff: 4,
            loading_indicator_delay_ms: 250,
            cursor_resting_delay_ms: 250,
            inotify_blacklist: Vec::new(),
            default_sort: SortSettings::default(),
            worker_threads: None,
            image_extensions: [
                "png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff", "ico",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Config {
    pub fn inotify_timeout(&self) -> Duration {
        Duration::from_millis(self.inotify_timeout_ms)
    }

    pub fn inotify_delay(&self) -> Duration {
        Duration::from_millis(self.inotify_delay_ms)
    }

    pub fn loading_indicator_delay(&self) -> Duration {
        Duration::from_millis(self.loading_indicator_delay_ms)
    }

    pub fn cursor_resting_delay(&self) -> Duration {
        Duration::from_millis(self.cursor_resting_delay_ms)
    }

    fn config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("dir-engine").join("config.toml"))
    }

    /// Load from disk, falling back to defaults if the file is missing or
    /// malformed (a malformed config should never prevent startup).
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).unwrap_or_else(|err| {
                tracing::warn!("{}: failed to parse config, using defaults: {err}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Is `path` covered by a blacklisted prefix? O(#prefixes) per call, as
    /// in the original `notify_add_watcher`.
    pub fn is_notify_blacklisted(&self, path: &str) -> bool {
        self.inotify_blacklist.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.inotify_timeout_ms, 1000);
        assert_eq!(cfg.inotify_delay_ms, 50);
    }

    #[test]
    fn blacklist_is_prefix_match() {
        let mut cfg = Config::default();
        cfg.inotify_blacklist.push("/proc".to_string());
        assert!(cfg.is_notify_blacklisted("/proc/self"));
        assert!(!cfg.is_notify_blacklisted("/home/proc-data"));
    }

    #[test]
    fn roundtrips_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.inotify_timeout_ms, cfg.inotify_timeout_ms);
    }
}
