//! Metadata snapshots: `path → last-modified millis` per folder store.
//!
//! Stored as `metadata.txt` inside the folder's index directory, one
//! `<absolutePath>\t<mtimeMillis>` entry per line. Paths may contain tabs;
//! the mtime is whatever follows the last one.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SearchError;

pub const METADATA_FILENAME: &str = "metadata.txt";

/// Absolute path → last-modified time in milliseconds since the epoch.
pub type MetadataSnapshot = BTreeMap<String, i64>;

pub fn metadata_path(index_dir: &Path) -> PathBuf {
    index_dir.join(METADATA_FILENAME)
}

/// Read the snapshot stored in `index_dir`.
///
/// Missing file yields an empty snapshot. Malformed lines (no tab, non-numeric
/// mtime) are skipped one by one; an unreadable file is treated as empty.
pub fn read_metadata(index_dir: &Path) -> MetadataSnapshot {
    let path = metadata_path(index_dir);
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return MetadataSnapshot::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read metadata, treating as empty");
            return MetadataSnapshot::new();
        }
    };
    parse_metadata(&String::from_utf8_lossy(&raw))
}

/// Parse snapshot text. Later duplicates of a path win.
pub fn parse_metadata(content: &str) -> MetadataSnapshot {
    let mut map = MetadataSnapshot::new();
    let mut skipped = 0usize;
    for line in content.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        match line.rsplit_once('\t') {
            Some((path, mtime)) if !path.is_empty() => match mtime.trim().parse::<i64>() {
                Ok(mtime) => {
                    map.insert(path.to_string(), mtime);
                }
                Err(_) => skipped += 1,
            },
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, kept = map.len(), "Skipped malformed metadata lines");
    }
    map
}

/// Replace the snapshot in `index_dir` with `snapshot`.
///
/// Written to a temporary sibling and renamed into place, so a reader sees
/// either the old snapshot or the new one.
pub fn write_metadata(index_dir: &Path, snapshot: &MetadataSnapshot) -> Result<(), SearchError> {
    let path = metadata_path(index_dir);
    let tmp = path.with_extension("txt.tmp");
    {
        let mut writer = BufWriter::new(fs::File::create(&tmp)?);
        for (file, mtime) in snapshot {
            writeln!(writer, "{}\t{}", file, mtime)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, &path)?;
    debug!(path = %path.display(), entries = snapshot.len(), "Metadata written");
    Ok(())
}
