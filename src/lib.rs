//! # imgsearch: offline image text search
//!
//! Per-folder inverted index over text extracted from images (OCR), kept in
//! sync incrementally as files are added, modified or removed.
//!
//! ## Library usage
//!
//! The binary is a thin CLI. Everything it does goes through [`IndexManager`]:
//!
//! ```no_run
//! use imgsearch::{IndexManager, NullReporter, SidecarExtractor, Storage};
//! use std::path::Path;
//!
//! let storage = Storage::new("storage").unwrap();
//! let manager = IndexManager::new(storage, SidecarExtractor::default());
//! manager.update_index(Path::new("/photos/scans"), &NullReporter, false).unwrap();
//! let hits = manager.search(Path::new("/photos/scans"), "invoice", 10).unwrap();
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod changes;
pub mod config;
pub mod error;
pub mod extract;
pub mod folder_id;
pub mod index;
pub mod manager;
pub mod metadata;
pub mod progress;
pub mod query;
pub mod watcher;
pub mod worker;

pub use changes::{detect_changes, list_image_files, ChangeSet, FileRecord};
pub use config::{default_storage_root, FolderIdScheme, Storage};
pub use error::SearchError;
pub use extract::{ExtractError, SidecarExtractor, TesseractExtractor, TextExtractor};
pub use folder_id::{folder_id, folder_id_with};
pub use index::{FolderIndex, IndexDocument, IndexStore, IndexWriter, Posting};
pub use manager::{FileOutcome, FolderState, IndexManager, IndexSummary, UpdateReport};
pub use metadata::{read_metadata, write_metadata, MetadataSnapshot};
pub use progress::{
    CancelToken, ChannelReporter, LatestProgress, NullReporter, ProgressEvent, ProgressReporter,
};
pub use query::{parse_query, snippet, Query, MATCH_ALL};
pub use watcher::{watch_folder, DEFAULT_DEBOUNCE_MS};
pub use worker::{IndexJob, IndexWorker, PROGRESS_CHANNEL_CAPACITY};

/// Minimum token length used for indexing and search.
/// OCR output carries meaningful single characters (digits, initials), so nothing is dropped.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 1;

/// Image extensions picked up by a folder scan (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

// ─── Stable hashing ─────────────────────────────────────────────────

/// Stable FNV-1a hash (deterministic across Rust versions, unlike `DefaultHasher`).
///
/// Accepts multiple byte slices that are fed into the hash sequentially.
#[must_use]
pub fn stable_hash(parts: &[&[u8]]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = FNV_OFFSET;
    for part in parts {
        for &byte in *part {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

// ─── Paths ──────────────────────────────────────────────────────────

/// Strip the `\\?\` extended-length path prefix that Windows canonicalize adds.
#[must_use]
pub fn clean_path(p: &str) -> String {
    p.strip_prefix(r"\\?\").unwrap_or(p).to_string()
}

/// Absolute form of a folder or file path as a plain string.
///
/// Canonicalizes when the path exists; otherwise joins it onto the current
/// directory so ids stay stable for folders that were deleted after indexing.
pub fn absolute_path_string(path: &Path) -> String {
    clean_path(&absolute_path(path).to_string_lossy())
}

/// Absolute form of `path`, canonicalized when it exists.
pub fn absolute_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// True when the file name ends in one of [`IMAGE_EXTENSIONS`].
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Current time in Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

// ─── Tokenizer ──────────────────────────────────────────────────────

/// Tokenize text into lowercase tokens.
///
/// Splits on non-alphanumeric characters (except `_`),
/// filters by minimum length, and lowercases all tokens.
///
/// # Examples
///
/// ```
/// use imgsearch::tokenize;
///
/// let tokens = tokenize("INVOICE #2021-04, total: $12.50", 1);
/// assert_eq!(tokens, vec!["invoice", "2021", "04", "total", "12", "50"]);
/// ```
#[must_use]
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|s| !s.is_empty() && s.chars().count() >= min_len)
        .map(|s| s.to_lowercase())
        .collect()
}
