//! Folder identity: a stable storage id derived from a folder's absolute path.

use std::path::Path;

use sha1::{Digest, Sha1};

use crate::config::FolderIdScheme;
use crate::{absolute_path_string, stable_hash};

/// SHA-1 hex digest of the folder's absolute path (40 lowercase hex chars).
pub fn folder_id(folder: &Path) -> String {
    folder_id_with(folder, FolderIdScheme::Sha1)
}

/// Folder id under an explicit scheme.
///
/// [`FolderIdScheme::Fnv`] is the weaker fallback: a 64-bit FNV-1a hash
/// rendered as 16 hex chars. Stable across runs, but collisions are only
/// improbable, not cryptographically hard.
pub fn folder_id_with(folder: &Path, scheme: FolderIdScheme) -> String {
    id_for_path_str(&absolute_path_string(folder), scheme)
}

/// Id for an already-absolute path string. Pure: no filesystem access.
pub fn id_for_path_str(abs_path: &str, scheme: FolderIdScheme) -> String {
    match scheme {
        FolderIdScheme::Sha1 => {
            let digest = Sha1::digest(abs_path.as_bytes());
            hex::encode(digest)
        }
        FolderIdScheme::Fnv => format!("{:016x}", stable_hash(&[abs_path.as_bytes()])),
    }
}
