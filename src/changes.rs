//! Folder listing and change detection against the previous metadata snapshot.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::metadata::MetadataSnapshot;
use crate::{absolute_path, clean_path, is_image_file};

/// One image file currently present in a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path as text; the key in the index and the metadata snapshot
    pub path: String,
    /// Path on disk, possibly not valid UTF-8; what the extractor opens
    pub source: PathBuf,
    /// Last-modified time, milliseconds since the epoch
    pub modified_ms: i64,
}

impl FileRecord {
    /// Record whose on-disk path is exactly `path`.
    pub fn new(path: impl Into<String>, modified_ms: i64) -> Self {
        let path = path.into();
        Self { source: PathBuf::from(&path), path, modified_ms }
    }
}

/// Delta between the stored snapshot and the live listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Paths present in the old snapshot but gone from disk (sorted)
    pub removed: Vec<String>,
    /// New, modified or force-reindexed files, in listing order
    pub to_index: Vec<FileRecord>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.to_index.is_empty()
    }
}

fn mtime_millis(meta: &std::fs::Metadata) -> i64 {
    match meta.modified() {
        Ok(t) => match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i64,
            Err(e) => -(e.duration().as_millis() as i64),
        },
        Err(_) => 0,
    }
}

/// List image files directly inside `folder` (non-recursive), sorted by name.
///
/// Hidden files are included and ignore files are not consulted: every
/// image the user can see in the folder is a candidate. Names that are not
/// valid UTF-8 are keyed by their lossy text; if two such names collapse to
/// the same key, only the first is listed.
pub fn list_image_files(folder: &Path) -> Result<Vec<FileRecord>, SearchError> {
    if !folder.is_dir() {
        return Err(SearchError::DirNotFound(folder.display().to_string()));
    }
    let root = absolute_path(folder);

    let mut builder = WalkBuilder::new(&root);
    builder
        .standard_filters(false)
        .follow_links(true)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut files = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if !is_image_file(entry.path()) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "Skipping file without metadata");
                continue;
            }
        };
        let path = clean_path(&entry.path().to_string_lossy());
        if !seen.insert(path.clone()) {
            warn!(path = %path, "Skipping image whose name collides with another after UTF-8 conversion");
            continue;
        }
        files.push(FileRecord {
            path,
            source: entry.into_path(),
            modified_ms: mtime_millis(&meta),
        });
    }
    Ok(files)
}

/// Compare the old snapshot with the current listing.
///
/// A file is (re)indexed when `force` is set, when it is new, or when its
/// stored mtime differs from the current one in either direction.
pub fn detect_changes(old: &MetadataSnapshot, current: &[FileRecord], force: bool) -> ChangeSet {
    let present: HashSet<&str> = current.iter().map(|f| f.path.as_str()).collect();

    let removed: Vec<String> = old
        .keys()
        .filter(|p| !present.contains(p.as_str()))
        .cloned()
        .collect();

    let to_index: Vec<FileRecord> = current
        .iter()
        .filter(|f| force || old.get(&f.path) != Some(&f.modified_ms))
        .cloned()
        .collect();

    ChangeSet { removed, to_index }
}

/// Snapshot mirroring the live listing exactly.
pub fn snapshot_of(current: &[FileRecord]) -> MetadataSnapshot {
    current
        .iter()
        .map(|f| (f.path.clone(), f.modified_ms))
        .collect()
}
