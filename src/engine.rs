//! The async façade tying the worker pool, caches, notify subsystem, and
//! loader throttling together into one thing the rest of an application
//! drives.
//!
//! Grounded on the original's `async/*.c` job catalog (`async_chdir_worker`,
//! `async_dir_load_worker`, `async_load_fileinfo`) for which jobs exist and
//! what each one produces; on the teacher's `app/fs_runtime.rs::FsUpdate`
//! for the "one enum of possible worker outcomes, drained on the main
//! thread" idiom — the same reason a worker here can just call
//! `.send()` on a cloned `UnboundedSender` without any async machinery of
//! its own.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use tokio::sync::mpsc;

use crate::cache::{DirCache, Preview, PreviewCache};
use crate::config::Config;
use crate::dir::Dir;
use crate::error::EngineError;
use crate::fm::{Fm, PasteMode};
use crate::hooks::{Hook, HookSink, NullHookSink};
use crate::loader::ReloadState;
use crate::notify::NotifyState;
use crate::preview;
use crate::validity::ValidityCheck;
use crate::worker::WorkerPool;

/// Time budget for one fileinfo batch before yielding the worker back to
/// the pool, mirroring `FILEINFO_THRESHOLD` in `async/dir.c`.
pub const FILEINFO_BATCH_BUDGET: std::time::Duration = std::time::Duration::from_millis(200);

#[derive(Debug)]
pub enum EngineEvent {
    /// `initial` is true for a directory's first-ever load (fires the
    /// `DirLoaded` hook once it lands); false for a reload of an already
    /// cached directory (fires `DirUpdated` instead).
    DirLoaded { path: PathBuf, dir: Dir, check: ValidityCheck, initial: bool },
    /// A later, more-detailed pass over a directory's entries (symlink
    /// resolution, child counts). `dir_updates_at_submit` lets the main
    /// thread drop the whole batch if `update_with` landed in the
    /// meantime and the flatten level no longer matches (see design
    /// ledger: this rule is load-bearing, not incidental).
    FileInfoBatch { path: PathBuf, files: Vec<crate::file::File>, dir_updates_at_submit: u64, check: ValidityCheck },
    PreviewLoaded { path: PathBuf, preview: Preview, check: ValidityCheck },
    ChdirResult { origin: PathBuf, target: PathBuf, ok: bool },
    Failed(EngineError),
}

pub struct Engine {
    pub config: Config,
    pub dir_cache: DirCache,
    pub preview_cache: PreviewCache,
    pub notify: NotifyState,
    pub fm: Fm,
    pool: WorkerPool,
    reload_states: HashMap<PathBuf, ReloadState>,
    tx: mpsc::UnboundedSender<EngineEvent>,
    rx: mpsc::UnboundedReceiver<EngineEvent>,
    hooks: Box<dyn HookSink>,
}

impl Engine {
    pub fn new(config: Config, cwd: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let num_threads = config.worker_threads.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get() + 1).unwrap_or(4));
        Self {
            config,
            dir_cache: DirCache::new(),
            preview_cache: PreviewCache::new(),
            notify: NotifyState::new(),
            fm: Fm::new(cwd),
            pool: WorkerPool::new(num_threads),
            reload_states: HashMap::new(),
            tx,
            rx,
            hooks: Box::new(NullHookSink),
        }
    }

    /// Install the embedder's hook sink, replacing the no-op default.
    pub fn set_hook_sink(&mut self, sink: Box<dyn HookSink>) {
        self.hooks = sink;
    }

    /// Submit a directory load. Inserts a placeholder `Dir` in `Loading`
    /// state immediately so the UI has something to render right away.
    pub fn request_dir_load(&mut self, path: PathBuf, flatten_level: u32) {
        let is_new = !self.dir_cache.contains(&path);
        if is_new {
            let mut placeholder = Dir::empty(path.clone());
            placeholder.sort = self.config.default_sort;
            self.dir_cache.insert(placeholder);
        }
        self.reload_states.entry(path.clone()).or_insert_with(ReloadState::new).start_load(Instant::now());

        let check = ValidityCheck::capture(self.dir_cache.version());
        let tx = self.tx.clone();
        let sort = self.dir_cache.get(&path).map(|d| d.sort).unwrap_or(self.config.default_sort);

        self.pool.submit(Box::new(move || {
            let mut dir = Dir::empty(path.clone());
            dir.sort = sort;
            dir.flatten_level = flatten_level;
            let result = Dir::load_flat(&path, flatten_level);
            match result {
                Ok(files) => {
                    dir.set_files(files, SystemTime::now());
                    let _ = tx.send(EngineEvent::DirLoaded { path, dir, check, initial: is_new });
                }
                Err(err) => {
                    let _ = tx.send(EngineEvent::Failed(EngineError::Io { path, source: err }));
                }
            }
        }));
    }

    /// Called when an inotify event (or any other trigger) asks for a
    /// directory to be refreshed. Goes through the same throttling FSM a
    /// direct navigation does, so a burst of filesystem events collapses
    /// into at most one reload per `timeout` window (P3).
    pub fn request_reload(&mut self, path: PathBuf, flatten_level: u32) {
        let now = Instant::now();
        let timeout = self.config.inotify_timeout();
        let delay = self.config.inotify_delay();
        let state = self.reload_states.entry(path.clone()).or_insert_with(ReloadState::new);
        if state.request(now, timeout, delay).is_some() {
            // fires eagerly from here; `poll_due_reloads` also picks up
            // anything scheduled for strictly later.
            if state.due(now) {
                self.start_scheduled_reload(path, flatten_level);
            }
        }
    }

    /// Drive the throttling timers. Call this periodically (the demo binary
    /// does so every `min(delay, 10ms)` via a `tokio::time::interval`).
    pub fn poll_due_reloads(&mut self, flatten_level: u32) {
        let now = Instant::now();
        let due: Vec<PathBuf> = self
            .reload_states
            .iter()
            .filter(|(_, state)| state.due(now))
            .map(|(path, _)| path.clone())
            .collect();
        for path in due {
            self.start_scheduled_reload(path, flatten_level);
        }
    }

    fn start_scheduled_reload(&mut self, path: PathBuf, flatten_level: u32) {
        let is_new = !self.dir_cache.contains(&path);
        self.reload_states.entry(path.clone()).or_insert_with(ReloadState::new).start_load(Instant::now());
        let check = ValidityCheck::capture(self.dir_cache.version());
        let sort = self.dir_cache.get(&path).map(|d| d.sort).unwrap_or(self.config.default_sort);
        let tx = self.tx.clone();
        self.pool.submit(Box::new(move || {
            let mut replacement = Dir::empty(path.clone());
            replacement.sort = sort;
            replacement.flatten_level = flatten_level;
            match Dir::load_flat(&path, flatten_level) {
                Ok(files) => {
                    replacement.set_files(files, SystemTime::now());
                    let _ = tx.send(EngineEvent::DirLoaded { path, dir: replacement, check, initial: is_new });
                }
                Err(err) => {
                    let _ = tx.send(EngineEvent::Failed(EngineError::Io { path, source: err }));
                }
            }
        }));
    }

    /// Queue a background pass that resolves symlinks and counts children
    /// for directories in `path`'s current listing. Run after every
    /// `DirLoaded` application, batched to `FILEINFO_BATCH_BUDGET` so a
    /// directory full of symlinks doesn't monopolize a worker thread.
    fn spawn_fileinfo_pass(&mut self, path: PathBuf) {
        let Some(dir) = self.dir_cache.get(&path) else { return };
        let dir_updates_at_submit = dir.updates;
        let targets: Vec<PathBuf> = dir
            .files_all()
            .iter()
            .filter(|f| (f.is_link() && f.stat.is_none()) || (f.is_dir() && f.filecount.is_none()))
            .map(|f| f.path.clone())
            .collect();
        if targets.is_empty() {
            return;
        }

        let check = ValidityCheck::capture(self.dir_cache.version());
        let tx = self.tx.clone();
        self.pool.submit(Box::new(move || {
            let start = Instant::now();
            let mut resolved = Vec::new();
            for target in targets {
                if start.elapsed() > FILEINFO_BATCH_BUDGET {
                    break;
                }
                let Ok(mut f) = crate::file::File::from_path(&target) else { continue };
                if f.is_link() {
                    f.resolve_link();
                }
                if f.is_dir() {
                    f.filecount = crate::file::File::count_children(&target);
                }
                resolved.push(f);
            }
            if !resolved.is_empty() {
                let _ = tx.send(EngineEvent::FileInfoBatch { path, files: resolved, dir_updates_at_submit, check });
            }
        }));
    }

    pub fn request_preview(&mut self, path: PathBuf) {
        let check = ValidityCheck::capture(self.preview_cache.version());
        let tx = self.tx.clone();
        self.pool.submit(Box::new(move || {
            match preview::build_preview(&path) {
                Ok(p) => {
                    let _ = tx.send(EngineEvent::PreviewLoaded { path, preview: p, check });
                }
                Err(err) => {
                    let _ = tx.send(EngineEvent::Failed(EngineError::Preview(err)));
                }
            }
        }));
    }

    /// Asynchronous chdir: stat the target on a worker thread first, only
    /// commit `fm.cwd` once that check lands. `target` is recorded as the
    /// pending chdir target so that, if a second `request_chdir` fires
    /// before this one's result lands, `apply`'s `ChdirResult` arm can tell
    /// the two apart and only commit whichever one is still current —
    /// matching `chdir_callback`'s "did pwd change while we were stat'ing"
    /// guard.
    pub fn request_chdir(&mut self, target: PathBuf) {
        let origin = self.fm.cwd.clone();
        self.fm.pending_chdir_target = Some(target.clone());
        let tx = self.tx.clone();
        self.pool.submit(Box::new(move || {
            let ok = std::fs::metadata(&target).map(|m| m.is_dir()).unwrap_or(false);
            let _ = tx.send(EngineEvent::ChdirResult { origin, target, ok });
        }));
    }

    /// Synchronous chdir: no worker round-trip, used when the caller
    /// already knows the target exists (e.g. moving to a parent column
    /// that's already loaded).
    pub fn chdir_sync(&mut self, target: PathBuf) -> bool {
        if target.is_dir() {
            self.fm.pending_chdir_target = None;
            self.fm.chdir(target.clone());
            std::env::set_var("PWD", &target);
            self.hooks.on_hook(Hook::ChdirPost(target));
            true
        } else {
            false
        }
    }

    /// Move the cursor in the directory cached at `path` by `delta` rows,
    /// keeping it `config.scrolloff` rows from the viewport edge.
    pub fn move_cursor(&mut self, path: &std::path::Path, delta: i64, viewport_height: usize) {
        let scrolloff = self.config.scrolloff as usize;
        if let Some(dir) = self.dir_cache.get_mut(path) {
            dir.cursor_move(delta, viewport_height, scrolloff);
        }
    }

    /// Set the paste buffer and fire `PasteBufChange`.
    pub fn set_paste(&mut self, mode: PasteMode, paths: Vec<PathBuf>) {
        self.fm.paste.set(mode, paths);
        self.hooks.on_hook(Hook::PasteBufChange);
    }

    /// Clear the paste buffer and fire `PasteBufChange`.
    pub fn clear_paste(&mut self) {
        self.fm.paste.clear();
        self.hooks.on_hook(Hook::PasteBufChange);
    }

    /// Drop every cached directory and cancel every outstanding reload
    /// timer for it — a bare `dir_cache.drop_all()` would leave
    /// version-invalidated `ReloadState`s around that `poll_due_reloads`
    /// would still (uselessly) submit load jobs for.
    pub fn drop_dir_cache(&mut self) {
        self.dir_cache.drop_all();
        self.reload_states.clear();
    }

    pub fn drop_preview_cache(&mut self) {
        self.preview_cache.drop_all();
    }

    /// Re-arm every pending (not in-flight) reload timer under the current
    /// `inotify_timeout`/`inotify_delay`, for when those settings change at
    /// runtime.
    pub fn reschedule(&mut self) {
        let now = Instant::now();
        let timeout = self.config.inotify_timeout();
        let delay = self.config.inotify_delay();
        for state in self.reload_states.values_mut() {
            state.reschedule(now, timeout, delay);
        }
    }

    /// Drain every result currently sitting in the queue, applying each to
    /// the caches in strict FIFO arrival order — the queue itself
    /// (`tokio::sync::mpsc`) already guarantees that ordering.
    pub fn drain_results(&mut self) -> Vec<EngineEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            self.apply(&event);
            drained.push(event);
        }
        drained
    }

    fn apply(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::DirLoaded { path, dir, check, initial } => {
                if !check.is_valid() {
                    return;
                }
                let timeout = self.config.inotify_timeout();
                let delay = self.config.inotify_delay();
                if let Some(existing) = self.dir_cache.get_mut(path) {
                    existing.sort = dir.sort;
                    let clone = clone_dir(dir);
                    existing.update_with(clone);
                } else {
                    self.dir_cache.insert(clone_dir(dir));
                }
                if let Some(state) = self.reload_states.get_mut(path) {
                    state.finish_load(Instant::now(), timeout, delay);
                }
                if *initial {
                    self.hooks.on_hook(Hook::DirLoaded(path.clone()));
                } else {
                    self.hooks.on_hook(Hook::DirUpdated(path.clone()));
                }
                self.spawn_fileinfo_pass(path.clone());
            }
            EngineEvent::FileInfoBatch { path, files, dir_updates_at_submit, check } => {
                if !check.is_valid() {
                    return;
                }
                if let Some(dir) = self.dir_cache.get_mut(path) {
                    // Drop the whole batch if an update-merge landed while
                    // it was computing; the flatten level (and therefore
                    // the set of entries) may no longer line up.
                    if dir.updates != *dir_updates_at_submit {
                        return;
                    }
                    apply_fileinfo_batch(dir, files);
                }
            }
            EngineEvent::PreviewLoaded { path, preview, check } => {
                if !check.is_valid() {
                    return;
                }
                self.preview_cache.insert(path.clone(), preview.clone());
            }
            EngineEvent::ChdirResult { target, ok, .. } => {
                // Discard if a later `request_chdir` has since superseded
                // this one — committing would finalize `cwd` at a stale
                // target depending on which worker result happens to land
                // first.
                if self.fm.pending_chdir_target.as_ref() != Some(target) {
                    return;
                }
                self.fm.pending_chdir_target = None;
                if *ok {
                    self.fm.chdir(target.clone());
                    std::env::set_var("PWD", target);
                    self.hooks.on_hook(Hook::ChdirPost(target.clone()));
                }
            }
            EngineEvent::Failed(_) => {}
        }
    }

    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}

fn clone_dir(dir: &Dir) -> Dir {
    let mut fresh = Dir::empty(dir.path.clone());
    fresh.sort = dir.sort;
    fresh.filter = dir.filter.clone();
    fresh.flatten_level = dir.flatten_level;
    if let Some(load_time) = dir.load_time {
        fresh.set_files(dir.files_all().to_vec(), load_time);
    }
    fresh
}

fn apply_fileinfo_batch(dir: &mut Dir, updates: &[crate::file::File]) {
    let mut all = dir.files_all().to_vec();
    for updated in updates {
        if let Some(slot) = all.iter_mut().find(|f| f.path == updated.path) {
            *slot = updated.clone();
        }
    }
    let load_time = dir.load_time.unwrap_or_else(SystemTime::now);
    dir.set_files(all, load_time);
}
