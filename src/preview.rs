//! Building a `Preview` for a single path: text snippet, image dimensions,
//! or a classification fallback for anything else.
//!
//! Grounded on `preview.c`/`previewheap.c` for the shape of the job (load
//! a bounded amount of content, cache it, discard it under memory
//! pressure via the heap-based eviction the original uses — reproduced
//! here as plain LRU-by-insertion-order on `PreviewCache`, see `cache.rs`)
//! and on the teacher's `core/inspector.rs` for the actual metadata-probe
//! idiom (`tree_magic_mini::from_filepath`, `image::ImageReader`).

use std::fs;
use std::path::Path;

use crate::cache::Preview;
use crate::error::PreviewError;

const MAX_TEXT_BYTES: usize = 64 * 1024;
const MAX_TEXT_LINES: usize = 2000;

/// Synchronous preview build; always run from a worker thread.
pub fn build_preview(path: &Path) -> Result<Preview, PreviewError> {
    let meta = fs::symlink_metadata(path).map_err(|_| PreviewError::SpawnFailed(path.to_path_buf()))?;

    if meta.is_dir() {
        return Ok(Preview::Directory);
    }

    let mime = tree_magic_mini::from_filepath(path).unwrap_or("application/octet-stream");

    if mime.starts_with("image/") {
        return Ok(build_image_preview(path));
    }

    if mime.starts_with("text/") || is_probably_text(path) {
        return Ok(build_text_preview(path));
    }

    Ok(Preview::Binary)
}

fn build_image_preview(path: &Path) -> Preview {
    match image::ImageReader::open(path).and_then(|r| r.with_guessed_format().map_err(Into::into)) {
        Ok(reader) => {
            let format = reader.format().map(|f| format!("{f:?}")).unwrap_or_else(|| "unknown".to_string());
            match reader.into_dimensions() {
                Ok((width, height)) => Preview::Image { width, height, format },
                Err(err) => Preview::Error(err.to_string()),
            }
        }
        Err(err) => Preview::Error(err.to_string()),
    }
}

fn build_text_preview(path: &Path) -> Preview {
    match fs::read(path) {
        Ok(bytes) => {
            let truncated_bytes = bytes.len() > MAX_TEXT_BYTES;
            let slice = &bytes[..bytes.len().min(MAX_TEXT_BYTES)];
            let text = String::from_utf8_lossy(slice);
            let mut lines: Vec<String> = text.lines().map(String::from).collect();
            let truncated = truncated_bytes || lines.len() > MAX_TEXT_LINES;
            lines.truncate(MAX_TEXT_LINES);
            Preview::Text { lines, truncated }
        }
        Err(err) => Preview::Error(err.to_string()),
    }
}

/// Cheap heuristic for files `tree_magic_mini` doesn't confidently classify
/// as text (e.g. small config files with no recognized extension): read a
/// sniff window and reject on a NUL byte or a high proportion of non-UTF8.
fn is_probably_text(path: &Path) -> bool {
    let Ok(bytes) = fs::read(path) else { return false };
    let sniff = &bytes[..bytes.len().min(8192)];
    if sniff.contains(&0) {
        return false;
    }
    std::str::from_utf8(sniff).is_ok()
}
