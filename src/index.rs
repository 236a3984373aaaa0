//! Per-folder inverted index: document model, ranked search, and durable storage.
//!
//! Each folder store directory holds one committed snapshot (`index.bin`,
//! LZ4-compressed bincode). Writers mutate an in-memory copy under an
//! exclusive file lock and publish it with an atomic rename on commit, so
//! readers always load a complete committed snapshot without taking the lock.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SearchError;
use crate::query::{parse_query, Query};
use crate::{now_unix_secs, tokenize, DEFAULT_MIN_TOKEN_LEN};

pub const INDEX_FILENAME: &str = "index.bin";
pub const LOCK_FILENAME: &str = "write.lock";

// ─── LZ4 compression helpers ────────────────────────────────────────

/// Magic bytes identifying LZ4-compressed index files.
pub const LZ4_MAGIC: &[u8; 4] = b"LZ4S";

/// Save a serializable value with LZ4 frame compression.
///
/// Writes magic bytes then LZ4-compressed bincode to a `.tmp` sibling, syncs,
/// and renames over `path`.
pub fn save_compressed<T: Serialize>(path: &Path, data: &T, label: &str) -> Result<(), SearchError> {
    let start = Instant::now();
    let tmp = path.with_extension("tmp");

    {
        let file = fs::File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(LZ4_MAGIC)?;
        let mut encoder = lz4_flex::frame::FrameEncoder::new(writer);
        bincode::serialize_into(&mut encoder, data)?;
        let mut writer = encoder.finish().map_err(std::io::Error::other)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, path)?;

    let compressed_size = fs::metadata(path)?.len();
    debug!(
        label,
        bytes = compressed_size,
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        path = %path.display(),
        "Saved compressed snapshot"
    );
    Ok(())
}

/// Load a value written by [`save_compressed`]; plain (uncompressed) bincode
/// files are accepted too.
pub fn load_compressed<T: serde::de::DeserializeOwned>(path: &Path, label: &str) -> Result<T, SearchError> {
    let path_str = path.display().to_string();
    let load_err = |message: String| SearchError::IndexLoad { path: path_str.clone(), message };
    let start = Instant::now();

    let file = fs::File::open(path).map_err(|e| load_err(format!("cannot open file: {}", e)))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    let has_magic = match reader.read_exact(&mut magic) {
        Ok(()) => &magic == LZ4_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(load_err(format!("read error (magic bytes): {}", e))),
    };

    let result = if has_magic {
        let decoder = lz4_flex::frame::FrameDecoder::new(reader);
        bincode::deserialize_from(decoder)
            .map_err(|e| load_err(format!("LZ4 deserialization failed: {}", e)))?
    } else {
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| load_err(format!("seek error: {}", e)))?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| load_err(format!("read error: {}", e)))?;
        bincode::deserialize(&buf).map_err(|e| load_err(format!("deserialization failed: {}", e)))?
    };

    debug!(
        label,
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "Loaded snapshot"
    );
    Ok(result)
}

// ─── Document model ─────────────────────────────────────────────────

/// One indexed image.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    /// Absolute image path (unique key)
    pub path: String,
    /// Extracted text, stored verbatim for previews
    pub text: String,
    pub modified_ms: i64,
    /// Number of tokens in `text` (for length normalization)
    pub token_count: u32,
}

/// A posting: document id + how often the token occurs in it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u32,
    pub freq: u32,
}

/// Inverted index for one folder.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct FolderIndex {
    /// Absolute folder path this index belongs to
    pub root: String,
    /// Unix seconds of the last commit
    pub updated_at: u64,
    /// doc_id → document; `None` marks a deleted slot until the next compaction
    pub docs: Vec<Option<IndexDocument>>,
    /// path → doc_id for live documents
    pub path_to_id: HashMap<String, u32>,
    /// token (lowercased) → postings
    pub index: HashMap<String, Vec<Posting>>,
}

fn term_frequencies(text: &str) -> (HashMap<String, u32>, u32) {
    let mut freqs: HashMap<String, u32> = HashMap::new();
    let mut total = 0u32;
    for token in tokenize(text, DEFAULT_MIN_TOKEN_LEN) {
        total += 1;
        *freqs.entry(token).or_default() += 1;
    }
    (freqs, total)
}

impl FolderIndex {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_to_id.is_empty()
    }

    /// Number of deleted slots awaiting compaction.
    pub fn tombstones(&self) -> usize {
        self.docs.len() - self.path_to_id.len()
    }

    pub fn get(&self, path: &str) -> Option<&IndexDocument> {
        let id = *self.path_to_id.get(path)?;
        self.docs.get(id as usize)?.as_ref()
    }

    /// Live documents in doc_id order.
    pub fn documents(&self) -> impl Iterator<Item = &IndexDocument> {
        self.docs.iter().flatten()
    }

    /// Insert or replace the document keyed by `path`.
    pub fn upsert(&mut self, path: &str, text: &str, modified_ms: i64) {
        let (freqs, token_count) = term_frequencies(text);
        let doc = IndexDocument {
            path: path.to_string(),
            text: text.to_string(),
            modified_ms,
            token_count,
        };

        let existing = self.path_to_id.get(path).copied();
        let doc_id = match existing {
            Some(id) => {
                self.purge_postings(id);
                self.docs[id as usize] = Some(doc);
                id
            }
            None => {
                let id = self.docs.len() as u32;
                self.docs.push(Some(doc));
                self.path_to_id.insert(path.to_string(), id);
                id
            }
        };

        for (token, freq) in freqs {
            self.index.entry(token).or_default().push(Posting { doc_id, freq });
        }
    }

    /// Remove the document keyed by `path`. Returns false if it was absent.
    pub fn delete(&mut self, path: &str) -> bool {
        let Some(id) = self.path_to_id.remove(path) else {
            return false;
        };
        self.purge_postings(id);
        self.docs[id as usize] = None;
        true
    }

    /// Drop the postings of `doc_id`. The stored text tells which token lists
    /// to touch, so no full scan of the inverted index is needed.
    fn purge_postings(&mut self, doc_id: u32) {
        let Some(Some(doc)) = self.docs.get(doc_id as usize) else {
            return;
        };
        let (freqs, _) = term_frequencies(&doc.text);
        for token in freqs.keys() {
            if let Some(postings) = self.index.get_mut(token) {
                postings.retain(|p| p.doc_id != doc_id);
                if postings.is_empty() {
                    self.index.remove(token);
                }
            }
        }
    }

    /// Renumber live documents densely, dropping deleted slots.
    pub fn compact(&mut self) {
        if self.tombstones() == 0 {
            return;
        }
        let mut remap: Vec<Option<u32>> = Vec::with_capacity(self.docs.len());
        let mut docs = Vec::with_capacity(self.path_to_id.len());
        for slot in self.docs.drain(..) {
            match slot {
                Some(doc) => {
                    remap.push(Some(docs.len() as u32));
                    docs.push(Some(doc));
                }
                None => remap.push(None),
            }
        }
        self.docs = docs;

        for postings in self.index.values_mut() {
            postings.retain_mut(|p| match remap.get(p.doc_id as usize).copied().flatten() {
                Some(new_id) => {
                    p.doc_id = new_id;
                    true
                }
                None => false,
            });
        }
        self.index.retain(|_, postings| !postings.is_empty());
        for id in self.path_to_id.values_mut() {
            if let Some(new_id) = remap.get(*id as usize).copied().flatten() {
                *id = new_id;
            }
        }
    }

    /// Paths matching `query`, best first, at most `max_results`.
    ///
    /// Match-all returns live documents in insertion order. Term queries are
    /// OR-combined. Documents containing more of the terms rank first (so
    /// `12.50` prefers pages with both `12` and `50`), then by Σ tf·idf with
    /// tf = occurrences / document length and idf = ln(1 + N/df); ties break
    /// on path.
    pub fn search(&self, query: &Query, max_results: usize) -> Vec<String> {
        let terms = match query {
            Query::MatchAll => {
                return self.documents().take(max_results).map(|d| d.path.clone()).collect();
            }
            Query::Terms(terms) => terms,
        };

        let total_docs = self.len() as f64;
        let mut scores: HashMap<u32, (u32, f64)> = HashMap::new();
        for term in terms {
            let Some(postings) = self.index.get(term.as_str()) else {
                continue;
            };
            let idf = (1.0 + total_docs / postings.len() as f64).ln();
            for posting in postings {
                let Some(Some(doc)) = self.docs.get(posting.doc_id as usize) else {
                    continue;
                };
                let tf = posting.freq as f64 / doc.token_count.max(1) as f64;
                let entry = scores.entry(posting.doc_id).or_default();
                entry.0 += 1;
                entry.1 += tf * idf;
            }
        }

        let mut ranked: Vec<(u32, f64, &str)> = scores
            .into_iter()
            .filter_map(|(id, (matched, score))| {
                self.docs.get(id as usize)?.as_ref().map(|d| (matched, score, d.path.as_str()))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.2.cmp(b.2))
        });
        ranked.into_iter().take(max_results).map(|(_, _, p)| p.to_string()).collect()
    }
}

// ─── Store ──────────────────────────────────────────────────────────

/// Handle on one folder's store directory (`<root>/indexes/<folderId>`).
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILENAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILENAME)
    }

    /// Load the committed snapshot; `None` if nothing was ever committed.
    pub fn load(&self) -> Result<Option<FolderIndex>, SearchError> {
        let path = self.snapshot_path();
        if !path.is_file() {
            return Ok(None);
        }
        load_compressed(&path, "folder-index").map(Some)
    }

    /// Ranked free-text search over the committed snapshot.
    ///
    /// Empty text or `*` matches everything. A store without a committed
    /// snapshot yields no results. Text with nothing searchable in it yields no
    /// results and a warning rather than an error.
    pub fn search_free_text(&self, query_text: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let query = match parse_query(query_text) {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "Query ignored");
                return Ok(Vec::new());
            }
        };
        match self.load()? {
            Some(index) => Ok(index.search(&query, max_results)),
            None => Ok(Vec::new()),
        }
    }

    /// Stored extracted text for an exact path.
    pub fn lookup_by_exact_path(&self, path: &str) -> Result<Option<String>, SearchError> {
        Ok(self.load()?.and_then(|index| index.get(path).map(|d| d.text.clone())))
    }

    /// True while some writer holds this store's lock.
    pub fn is_locked(&self) -> bool {
        let Ok(file) = fs::OpenOptions::new().read(true).write(true).open(self.lock_path()) else {
            return false;
        };
        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = file.unlock();
                false
            }
            Err(_) => true,
        }
    }

    /// Open a write session: takes the exclusive lock (blocking until any
    /// other writer of this folder finishes) and loads the committed snapshot.
    pub fn open_writer(&self, root: &str) -> Result<IndexWriter, SearchError> {
        fs::create_dir_all(&self.dir).map_err(|e| SearchError::index_store(&self.dir, e))?;
        let lock_path = self.lock_path();
        let lock = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| SearchError::index_store(&lock_path, format!("cannot open lock file: {}", e)))?;
        lock.lock_exclusive()
            .map_err(|e| SearchError::index_store(&lock_path, format!("cannot lock: {}", e)))?;

        let index = match self.load() {
            Ok(Some(index)) => index,
            Ok(None) => FolderIndex::new(root),
            Err(e) => return Err(SearchError::index_store(&self.dir, e)),
        };
        debug!(dir = %self.dir.display(), docs = index.len(), "Index writer opened");
        Ok(IndexWriter { store: self.clone(), _lock: lock, index, dirty: false })
    }
}

/// Exclusive write session on one folder store. Mutations stay invisible
/// until [`IndexWriter::commit`]; dropping the writer discards them.
#[derive(Debug)]
pub struct IndexWriter {
    store: IndexStore,
    _lock: fs::File,
    index: FolderIndex,
    dirty: bool,
}

impl IndexWriter {
    pub fn index(&self) -> &FolderIndex {
        &self.index
    }

    /// Remove the document for `path`; no-op if absent.
    pub fn delete_by_path(&mut self, path: &str) {
        if self.index.delete(path) {
            self.dirty = true;
        }
    }

    /// Insert or replace the document for `path`.
    pub fn upsert_document(&mut self, path: &str, text: &str, modified_ms: i64) {
        self.index.upsert(path, text, modified_ms);
        self.dirty = true;
    }

    /// Publish all mutations since the session opened (or the last commit).
    pub fn commit(&mut self) -> Result<(), SearchError> {
        if !self.dirty && self.store.snapshot_path().is_file() {
            debug!(dir = %self.store.dir.display(), "Nothing to commit");
            return Ok(());
        }
        if self.index.tombstones() > self.index.len() {
            self.index.compact();
        }
        self.index.updated_at = now_unix_secs();
        let path = self.store.snapshot_path();
        save_compressed(&path, &self.index, "folder-index")
            .map_err(|e| SearchError::index_store(&path, e))?;
        self.dirty = false;
        info!(
            dir = %self.store.dir.display(),
            docs = self.index.len(),
            tokens = self.index.index.len(),
            "Index committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod index_tests {
    use super::*;

    fn sample() -> FolderIndex {
        let mut idx = FolderIndex::new("/scans");
        idx.upsert("/scans/img1.png", "invoice 2021", 1);
        idx.upsert("/scans/img2.png", "receipt", 2);
        idx
    }

    fn terms(q: &str) -> Query {
        parse_query(q).unwrap()
    }

    #[test]
    fn test_upsert_replaces_never_duplicates() {
        let mut idx = sample();
        idx.upsert("/scans/img1.png", "credit note", 3);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get("/scans/img1.png").unwrap().text, "credit note");
        assert_eq!(idx.get("/scans/img1.png").unwrap().modified_ms, 3);
        assert!(!idx.index.contains_key("invoice"), "old tokens must be purged");
        assert!(idx.search(&terms("credit"), 10).contains(&"/scans/img1.png".to_string()));
    }

    #[test]
    fn test_delete_removes_postings() {
        let mut idx = sample();
        assert!(idx.delete("/scans/img1.png"));
        assert!(!idx.delete("/scans/img1.png"));
        assert!(idx.get("/scans/img1.png").is_none());
        assert!(!idx.index.contains_key("invoice"));
        assert!(idx.search(&Query::MatchAll, 10) == vec!["/scans/img2.png".to_string()]);
        assert_eq!(idx.tombstones(), 1);
    }

    #[test]
    fn test_shared_token_survives_delete_of_one_doc() {
        let mut idx = FolderIndex::new("/s");
        idx.upsert("/s/a.png", "total due", 1);
        idx.upsert("/s/b.png", "total paid", 1);
        idx.delete("/s/a.png");
        let total = idx.index.get("total").unwrap();
        assert_eq!(total.len(), 1);
        assert_eq!(idx.search(&terms("total"), 10), vec!["/s/b.png".to_string()]);
    }

    #[test]
    fn test_search_ranks_by_term_density() {
        let mut idx = FolderIndex::new("/s");
        idx.upsert("/s/long.png", "invoice plus a lot of other words here", 1);
        idx.upsert("/s/short.png", "invoice invoice", 1);
        idx.upsert("/s/none.png", "receipt", 1);
        let hits = idx.search(&terms("invoice"), 10);
        assert_eq!(hits, vec!["/s/short.png".to_string(), "/s/long.png".to_string()]);
    }

    #[test]
    fn test_search_or_semantics_and_limit() {
        let idx = sample();
        let both = idx.search(&terms("invoice receipt"), 10);
        assert_eq!(both.len(), 2);
        assert_eq!(idx.search(&terms("invoice receipt"), 1).len(), 1);
        assert!(idx.search(&terms("missing"), 10).is_empty());
    }

    #[test]
    fn test_docs_matching_all_terms_rank_first() {
        let mut idx = FolderIndex::new("/s");
        idx.upsert("/s/twelve.png", "12", 1);
        idx.upsert("/s/fifty.png", "50 50", 1);
        idx.upsert("/s/total.png", "Total due $12.50 for paper, toner, staples and delivery", 1);
        let hits = idx.search(&terms("$12.50"), 10);
        assert_eq!(hits.len(), 3, "still OR-combined");
        assert_eq!(hits[0], "/s/total.png");
    }

    #[test]
    fn test_term_in_every_doc_still_matches() {
        let mut idx = FolderIndex::new("/s");
        idx.upsert("/s/a.png", "scan", 1);
        idx.upsert("/s/b.png", "scan", 1);
        assert_eq!(idx.search(&terms("scan"), 10).len(), 2);
    }

    #[test]
    fn test_empty_text_document_is_listed_but_not_matched() {
        let mut idx = FolderIndex::new("/s");
        idx.upsert("/s/blank.png", "", 1);
        assert_eq!(idx.search(&Query::MatchAll, 10), vec!["/s/blank.png".to_string()]);
        assert!(idx.search(&terms("anything"), 10).is_empty());
    }

    #[test]
    fn test_compact_renumbers_and_keeps_search() {
        let mut idx = FolderIndex::new("/s");
        for i in 0..6 {
            idx.upsert(&format!("/s/{}.png", i), &format!("word{} common", i), 1);
        }
        for i in 0..4 {
            idx.delete(&format!("/s/{}.png", i));
        }
        idx.compact();
        assert_eq!(idx.tombstones(), 0);
        assert_eq!(idx.docs.len(), 2);
        assert_eq!(idx.search(&terms("word5"), 10), vec!["/s/5.png".to_string()]);
        assert_eq!(idx.search(&terms("common"), 10).len(), 2);
        assert!(!idx.index.contains_key("word0"));
        for (path, id) in &idx.path_to_id {
            assert_eq!(&idx.docs[*id as usize].as_ref().unwrap().path, path);
        }
    }

    #[test]
    fn test_store_without_dir_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("never-created"));
        assert!(store.search_free_text("invoice", 10).unwrap().is_empty());
        assert!(store.search_free_text("*", 10).unwrap().is_empty());
        assert!(store.lookup_by_exact_path("/x.png").unwrap().is_none());
    }

    #[test]
    fn test_mutations_invisible_until_commit() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("f"));
        let mut writer = store.open_writer("/scans").unwrap();
        writer.upsert_document("/scans/a.png", "invoice", 1);
        assert!(store.search_free_text("invoice", 10).unwrap().is_empty());
        writer.commit().unwrap();
        assert_eq!(store.search_free_text("invoice", 10).unwrap(), vec!["/scans/a.png".to_string()]);

        writer.delete_by_path("/scans/a.png");
        assert_eq!(store.search_free_text("*", 10).unwrap().len(), 1);
        drop(writer);
        assert_eq!(
            store.lookup_by_exact_path("/scans/a.png").unwrap().as_deref(),
            Some("invoice"),
            "dropped writer must not publish its delete"
        );
    }

    #[test]
    fn test_delete_then_commit_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("f"));
        let mut writer = store.open_writer("/scans").unwrap();
        writer.upsert_document("/scans/a.png", "invoice", 1);
        writer.upsert_document("/scans/b.png", "invoice", 1);
        writer.commit().unwrap();
        writer.delete_by_path("/scans/a.png");
        writer.delete_by_path("/scans/not-there.png");
        writer.commit().unwrap();

        let hits = store.search_free_text("invoice", 10).unwrap();
        assert_eq!(hits, vec!["/scans/b.png".to_string()]);
        assert!(!store.search_free_text("", 10).unwrap().contains(&"/scans/a.png".to_string()));
        assert!(store.lookup_by_exact_path("/scans/a.png").unwrap().is_none());
    }

    #[test]
    fn test_match_all_equivalence() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("f"));
        let mut writer = store.open_writer("/scans").unwrap();
        for i in 0..5 {
            writer.upsert_document(&format!("/scans/{}.png", i), "text", 1);
        }
        writer.commit().unwrap();
        let mut star = store.search_free_text("*", 3).unwrap();
        let mut empty = store.search_free_text("", 3).unwrap();
        star.sort();
        empty.sort();
        assert_eq!(star, empty);
        assert_eq!(star.len(), 3);
    }

    #[test]
    fn test_punctuation_query_never_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("f"));
        let mut writer = store.open_writer("/scans").unwrap();
        writer.upsert_document("/scans/a.png", "total: $12.50 (paid)", 1);
        writer.commit().unwrap();
        assert_eq!(store.search_free_text("(paid", 10).unwrap().len(), 1);
        assert_eq!(store.search_free_text("$12.50", 10).unwrap().len(), 1);
        assert!(store.search_free_text("?!&&", 10).unwrap().is_empty());
    }

    #[test]
    fn test_commit_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("f"));
        {
            let mut writer = store.open_writer("/scans").unwrap();
            writer.upsert_document("/scans/a.png", "hello", 7);
            writer.commit().unwrap();
        }
        let writer = store.open_writer("/scans").unwrap();
        assert_eq!(writer.index().get("/scans/a.png").unwrap().modified_ms, 7);
        assert_eq!(writer.index().root, "/scans");
        assert!(writer.index().updated_at > 0);
    }

    #[test]
    fn test_is_locked_while_writer_open() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("f"));
        assert!(!store.is_locked());
        let writer = store.open_writer("/scans").unwrap();
        assert!(store.is_locked());
        drop(writer);
        assert!(!store.is_locked());
    }

    #[test]
    fn test_corrupt_snapshot_fails_open_writer() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("f"));
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.snapshot_path(), b"LZ4Sgarbage-garbage").unwrap();
        let err = store.open_writer("/scans").unwrap_err();
        assert!(matches!(err, SearchError::IndexStore { .. }), "got {:?}", err);
    }

    // ─── LZ4 compression tests ──────────────────────────────

    #[test]
    fn test_save_load_compressed_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bin");
        let data = vec!["hello".to_string(), "world".to_string()];
        save_compressed(&path, &data, "test").unwrap();
        let loaded: Vec<String> = load_compressed(&path, "test").unwrap();
        assert_eq!(data, loaded);
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..4], LZ4_MAGIC);
        assert!(!tmp.path().join("test.tmp").exists());
    }

    #[test]
    fn test_load_compressed_legacy_uncompressed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("legacy.bin");
        let data = vec!["legacy".to_string(), "format".to_string()];
        std::fs::write(&path, bincode::serialize(&data).unwrap()).unwrap();
        let loaded: Vec<String> = load_compressed(&path, "test").unwrap();
        assert_eq!(data, loaded);
    }

    #[test]
    fn test_load_compressed_missing_file_returns_err() {
        let result: Result<Vec<String>, _> = load_compressed(Path::new("/nonexistent/file.bin"), "test");
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to load index"), "got: {}", msg);
    }
}
