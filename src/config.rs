//! Storage configuration: where per-folder indexes live and how folders are named.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SearchError;
use crate::folder_id::folder_id_with;

/// Name of the directory under the storage root holding one subdirectory per folder id.
pub const INDEXES_DIRNAME: &str = "indexes";

/// Environment variable overriding the default storage root.
pub const STORAGE_ENV: &str = "IMGSEARCH_STORAGE";

/// Environment variable selecting the folder id scheme (`sha1` or `fnv`).
pub const FOLDER_ID_ENV: &str = "IMGSEARCH_FOLDER_ID";

/// How a folder path is turned into its storage id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderIdScheme {
    /// 40-char SHA-1 hex digest of the absolute path.
    #[default]
    Sha1,
    /// 16-char FNV-1a hex hash. Weaker: 64-bit, not collision-resistant
    /// against crafted input. Only for environments without the digest.
    Fnv,
}

impl FolderIdScheme {
    /// Parse from a config string; unknown values fall back to the default.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "fnv" | "fnv1a" => FolderIdScheme::Fnv,
            _ => FolderIdScheme::Sha1,
        }
    }

    fn from_env() -> Self {
        std::env::var(FOLDER_ID_ENV)
            .map(|v| Self::from_name(&v))
            .unwrap_or_default()
    }
}

/// Default storage root: `$IMGSEARCH_STORAGE`, else `<data_local_dir>/imgsearch`,
/// else `./storage`.
pub fn default_storage_root() -> PathBuf {
    if let Some(root) = std::env::var_os(STORAGE_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    dirs::data_local_dir()
        .map(|base| base.join("imgsearch"))
        .unwrap_or_else(|| PathBuf::from("storage"))
}

/// Materialized storage root. Construction guarantees `<root>/indexes` exists.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    indexes: PathBuf,
    scheme: FolderIdScheme,
}

impl Storage {
    /// Create (if needed) the storage root and its `indexes` directory.
    /// The folder id scheme comes from `IMGSEARCH_FOLDER_ID` (default SHA-1).
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SearchError> {
        Self::with_scheme(root, FolderIdScheme::from_env())
    }

    pub fn with_scheme(root: impl Into<PathBuf>, scheme: FolderIdScheme) -> Result<Self, SearchError> {
        let root = root.into();
        let indexes = root.join(INDEXES_DIRNAME);
        fs::create_dir_all(&indexes).map_err(|source| SearchError::Configuration {
            path: root.display().to_string(),
            source,
        })?;
        debug!(root = %root.display(), ?scheme, "Storage root ready");
        Ok(Self { root, indexes, scheme })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/indexes`
    pub fn indexes_dir(&self) -> &Path {
        &self.indexes
    }

    pub fn scheme(&self) -> FolderIdScheme {
        self.scheme
    }

    /// Storage id for a folder under this storage's scheme.
    pub fn folder_id(&self, folder: &Path) -> String {
        folder_id_with(folder, self.scheme)
    }

    /// `<root>/indexes/<folderId>`
    pub fn index_dir_for(&self, folder: &Path) -> PathBuf {
        self.indexes.join(self.folder_id(folder))
    }

    /// Every folder store directory currently present, in name order.
    pub fn index_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = match fs::read_dir(&self.indexes) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
            Err(_) => Vec::new(),
        };
        dirs.sort();
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_creates_indexes_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("storage");
        let storage = Storage::with_scheme(&root, FolderIdScheme::Sha1).unwrap();
        assert!(storage.indexes_dir().is_dir());
        assert_eq!(storage.indexes_dir(), root.join(INDEXES_DIRNAME));
    }

    #[test]
    fn test_storage_root_is_a_file_fails_with_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();
        let err = Storage::with_scheme(&file, FolderIdScheme::Sha1).unwrap_err();
        assert!(matches!(err, SearchError::Configuration { .. }), "got {:?}", err);
    }

    #[test]
    fn test_index_dir_for_uses_scheme() {
        let tmp = tempfile::tempdir().unwrap();
        let sha = Storage::with_scheme(tmp.path(), FolderIdScheme::Sha1).unwrap();
        let fnv = Storage::with_scheme(tmp.path(), FolderIdScheme::Fnv).unwrap();
        let folder = Path::new("/photos/2021");
        let sha_name = sha.index_dir_for(folder).file_name().unwrap().to_string_lossy().to_string();
        let fnv_name = fnv.index_dir_for(folder).file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(sha_name.len(), 40);
        assert_eq!(fnv_name.len(), 16);
    }

    #[test]
    fn test_index_dirs_lists_only_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::with_scheme(tmp.path(), FolderIdScheme::Sha1).unwrap();
        std::fs::create_dir(storage.indexes_dir().join("bbb")).unwrap();
        std::fs::create_dir(storage.indexes_dir().join("aaa")).unwrap();
        std::fs::write(storage.indexes_dir().join("stray.txt"), b"x").unwrap();
        let names: Vec<String> = storage
            .index_dirs()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_scheme_from_name() {
        assert_eq!(FolderIdScheme::from_name("fnv"), FolderIdScheme::Fnv);
        assert_eq!(FolderIdScheme::from_name(" FNV1A "), FolderIdScheme::Fnv);
        assert_eq!(FolderIdScheme::from_name("sha1"), FolderIdScheme::Sha1);
        assert_eq!(FolderIdScheme::from_name("whatever"), FolderIdScheme::Sha1);
    }
}
