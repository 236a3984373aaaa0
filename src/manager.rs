//! Index manager: incremental per-folder updates, search, and text lookup.
//!
//! The manager is the only writer of a folder's index and metadata. An update
//! holds the folder's store lock from the moment it reads the old metadata
//! until the new snapshot is written, so concurrent updates of one folder run
//! one after another while different folders proceed independently.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::changes::{detect_changes, list_image_files, snapshot_of};
use crate::config::Storage;
use crate::error::SearchError;
use crate::extract::TextExtractor;
use crate::index::IndexStore;
use crate::metadata::{read_metadata, write_metadata};
use crate::progress::{percent_done, CancelToken, ProgressReporter};
use crate::absolute_path_string;

/// Lifecycle of one folder's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderState {
    /// No committed index yet
    Unindexed,
    /// An update holds the folder's write lock
    Indexing,
    /// A committed index exists and nobody is writing
    Indexed,
}

/// Result of processing one image in an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Indexed { path: String, chars: usize },
    /// Extraction failed; the image was indexed with empty text.
    ExtractionFailed { path: String, message: String },
}

impl FileOutcome {
    pub fn path(&self) -> &str {
        match self {
            FileOutcome::Indexed { path, .. } | FileOutcome::ExtractionFailed { path, .. } => path,
        }
    }
}

/// What one `update_index` run did.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub folder_id: String,
    pub folder: String,
    /// Paths dropped from the index because the files are gone
    pub removed: Vec<String>,
    /// One entry per new/changed image, in listing order
    pub outcomes: Vec<FileOutcome>,
    /// Images currently in the folder
    pub total_files: usize,
    pub elapsed: Duration,
}

impl UpdateReport {
    pub fn indexed_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::ExtractionFailed { .. }))
            .count()
    }
}

/// One folder store as seen by `list_indexes`.
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub folder_id: String,
    /// Absolute folder path recorded in the snapshot
    pub root: String,
    pub documents: usize,
    /// Unix seconds of the last commit
    pub updated_at: u64,
    pub state: FolderState,
}

fn display_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

pub struct IndexManager {
    storage: Storage,
    extractor: Arc<dyn TextExtractor>,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl IndexManager {
    pub fn new(storage: Storage, extractor: impl TextExtractor + 'static) -> Self {
        Self { storage, extractor: Arc::new(extractor) }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn store_for(&self, folder: &Path) -> IndexStore {
        IndexStore::new(self.storage.index_dir_for(folder))
    }

    pub fn folder_state(&self, folder: &Path) -> FolderState {
        let store = self.store_for(folder);
        if !store.exists() {
            FolderState::Unindexed
        } else if store.is_locked() {
            FolderState::Indexing
        } else if store.snapshot_path().is_file() {
            FolderState::Indexed
        } else {
            FolderState::Unindexed
        }
    }

    pub fn is_indexed(&self, folder: &Path) -> bool {
        self.folder_state(folder) == FolderState::Indexed
    }

    /// Bring the folder's index in line with the files on disk.
    pub fn update_index(
        &self,
        folder: &Path,
        reporter: &dyn ProgressReporter,
        force_reindex: bool,
    ) -> Result<UpdateReport, SearchError> {
        self.update_index_with_cancel(folder, reporter, force_reindex, &CancelToken::new())
    }

    /// [`update_index`](Self::update_index) with cooperative cancellation,
    /// checked before each image. A cancelled run commits nothing and leaves
    /// the previous index and metadata as they were.
    pub fn update_index_with_cancel(
        &self,
        folder: &Path,
        reporter: &dyn ProgressReporter,
        force_reindex: bool,
        cancel: &CancelToken,
    ) -> Result<UpdateReport, SearchError> {
        let start = Instant::now();
        if !folder.is_dir() {
            return Err(SearchError::DirNotFound(folder.display().to_string()));
        }
        let root = absolute_path_string(folder);
        let folder_id = self.storage.folder_id(folder);
        let store = self.store_for(folder);

        if !store.exists() {
            info!(folder = %root, folder_id = %folder_id, "Creating index");
            fs::create_dir_all(store.dir()).map_err(|e| SearchError::index_store(store.dir(), e))?;
        }

        // Held until the metadata snapshot is written.
        let mut writer = store.open_writer(&root)?;

        let old_meta = read_metadata(store.dir());
        let current = list_image_files(folder)?;
        let changes = detect_changes(&old_meta, &current, force_reindex);
        info!(
            folder_id = %folder_id,
            files = current.len(),
            removed = changes.removed.len(),
            to_index = changes.to_index.len(),
            force = force_reindex,
            "Index update started"
        );

        for path in &changes.removed {
            reporter.message(&format!("Removing deleted: {}", display_name(path)));
            writer.delete_by_path(path);
        }

        let total = changes.to_index.len();
        let mut outcomes = Vec::with_capacity(total);
        for (done, file) in changes.to_index.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(folder_id = %folder_id, done, total, "Index update cancelled, nothing committed");
                return Err(SearchError::Cancelled);
            }
            reporter.message(&format!("OCR: {} ({}/{})", display_name(&file.path), done + 1, total));

            let (text, outcome) = match self.extractor.extract(&file.source) {
                Ok(text) => {
                    let chars = text.chars().count();
                    (text, FileOutcome::Indexed { path: file.path.clone(), chars })
                }
                Err(e) => {
                    warn!(path = %file.path, error = %e, "Text extraction failed, indexing with empty text");
                    let message = e.to_string();
                    (String::new(), FileOutcome::ExtractionFailed { path: file.path.clone(), message })
                }
            };
            writer.upsert_document(&file.path, &text, file.modified_ms);
            outcomes.push(outcome);
            reporter.progress(percent_done(done + 1, total));
        }

        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        writer.commit()?;

        write_metadata(store.dir(), &snapshot_of(&current))
            .map_err(|e| SearchError::index_store(store.dir(), e))?;
        drop(writer);

        reporter.message(&format!("Index updated: {}", display_name(&root)));
        reporter.progress(100);

        let report = UpdateReport {
            folder_id,
            folder: root,
            removed: changes.removed,
            outcomes,
            total_files: current.len(),
            elapsed: start.elapsed(),
        };
        info!(
            folder_id = %report.folder_id,
            indexed = report.indexed_count(),
            failed = report.failed_count(),
            removed = report.removed.len(),
            elapsed_ms = format_args!("{:.1}", report.elapsed.as_secs_f64() * 1000.0),
            "Index update complete"
        );
        Ok(report)
    }

    /// Ranked paths for `query_text` in the folder's committed index.
    /// Empty text or `*` lists everything; an unindexed folder yields nothing.
    pub fn search(&self, folder: &Path, query_text: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let store = self.store_for(folder);
        if !store.exists() {
            debug!(folder = %folder.display(), "Search on unindexed folder");
            return Ok(Vec::new());
        }
        store.search_free_text(query_text, max_results)
    }

    /// Extracted text stored for an exact image path, searched across every
    /// folder store. Unreadable stores are skipped.
    pub fn get_extracted_text_for_path(&self, path: &str) -> Option<String> {
        for dir in self.storage.index_dirs() {
            match IndexStore::new(&dir).lookup_by_exact_path(path) {
                Ok(Some(text)) => return Some(text),
                Ok(None) => {}
                Err(e) => debug!(dir = %dir.display(), error = %e, "Skipping unreadable index"),
            }
        }
        None
    }

    /// Every folder store with a committed snapshot.
    pub fn list_indexes(&self) -> Vec<IndexSummary> {
        let mut out = Vec::new();
        for dir in self.storage.index_dirs() {
            let store = IndexStore::new(&dir);
            let folder_id = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match store.load() {
                Ok(Some(index)) => out.push(IndexSummary {
                    folder_id,
                    root: index.root.clone(),
                    documents: index.len(),
                    updated_at: index.updated_at,
                    state: if store.is_locked() { FolderState::Indexing } else { FolderState::Indexed },
                }),
                Ok(None) => {}
                Err(e) => warn!(dir = %dir.display(), error = %e, "Skipping unreadable index"),
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
