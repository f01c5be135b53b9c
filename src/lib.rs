//! Async state engine for a terminal file navigator: directory model,
//! loader/cache with preview, a worker pool feeding a result queue, and
//! inotify-driven reloads. No rendering or keybinding layer lives here —
//! callers own the event loop and UI.

pub mod cache;
pub mod config;
pub mod dir;
pub mod engine;
pub mod error;
pub mod file;
pub mod filter;
pub mod fm;
pub mod history;
pub mod hooks;
pub mod loader;
pub mod notify;
pub mod selection;
pub mod sort;
pub mod validity;
pub mod worker;

pub use cache::{DirCache, Preview, PreviewCache};
pub use config::Config;
pub use dir::Dir;
pub use engine::{Engine, EngineEvent};
pub use error::{EngineError, EngineResult};
pub use fm::Fm;
