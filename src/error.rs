//! Error taxonomy for the engine.
//!
//! Kinds, not blanket wrappers: each subsystem gets its own enum so that a
//! caller can match on *why* an operation failed without string-parsing.
//! None of these cross a thread boundary as a trait object — workers
//! package them into the relevant [`crate::engine::EngineResult`] variant
//! and the main thread unwraps them there.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("{0}: not a directory")]
    NotADirectory(PathBuf),
    #[error("{0}: permission denied")]
    PermissionDenied(PathBuf),
    #[error("{path}: stat failed (errno {errno})")]
    Stat { path: PathBuf, errno: i32 },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{path}: add_watch failed (errno {errno})")]
    AddWatch { path: PathBuf, errno: i32 },
    #[error("inotify event buffer overflowed, some events were dropped")]
    BufferOverflow,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker pool is shutting down")]
    Shutdown,
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("{0}: failed to spawn previewer")]
    SpawnFailed(PathBuf),
    #[error("lua previewer failed: {0}")]
    LuaFailed(String),
}

#[derive(Debug, Error)]
pub enum ChDirError {
    #[error("{path}: stat failed (errno {errno})")]
    Stat { path: PathBuf, errno: i32 },
    #[error("{path}: chdir failed (errno {errno})")]
    ChDir { path: PathBuf, errno: i32 },
}

/// Aggregate error type for engine-facing APIs that can fail for more than
/// one subsystem-specific reason.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
    #[error(transparent)]
    ChDir(#[from] ChDirError),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
