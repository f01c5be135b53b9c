//! Synchronous hook dispatch.
//!
//! Grounded on `hooks.c`/`hooks.h`: a fixed catalog of named signals fired
//! in-line with the engine action that triggers them. The original feeds
//! these to an embedded lua scripting host; that host is out of scope
//! here, so `HookSink` is a trait an embedder implements instead.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Hook {
    Resized,
    LfmEnter,
    ExitPre,
    ChdirPre,
    ChdirPost(PathBuf),
    PasteBufChange,
    SelectionChanged,
    DirLoaded(PathBuf),
    DirUpdated(PathBuf),
    ModeChanged,
    FocusGained,
    FocusLost,
}

/// Implemented by whatever embeds the engine (a scripting host, a test
/// harness that records calls, ...).
pub trait HookSink: Send {
    fn on_hook(&mut self, hook: Hook);
}

/// Default sink that does nothing; used when no embedder cares about
/// hooks (e.g. the demo binary).
pub struct NullHookSink;

impl HookSink for NullHookSink {
    fn on_hook(&mut self, _hook: Hook) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<String>);
    impl HookSink for Recorder {
        fn on_hook(&mut self, hook: Hook) {
            self.0.push(format!("{hook:?}"));
        }
    }

    #[test]
    fn sink_receives_hooks_in_order() {
        let mut rec = Recorder(Vec::new());
        rec.on_hook(Hook::ChdirPre);
        rec.on_hook(Hook::ChdirPost(PathBuf::from("/tmp")));
        assert_eq!(rec.0, vec!["ChdirPre", "ChdirPost(\"/tmp\")"]);
    }
}
