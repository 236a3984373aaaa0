//! Unified error type for indexing and search.

use thiserror::Error;

/// All errors that can occur in indexing and search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error (bincode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Storage root (or its `indexes` directory) cannot be created
    #[error("Cannot create storage root {path}: {source}")]
    Configuration {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Index directory cannot be opened, locked or written during an update.
    /// Previously committed state is untouched; safe to retry.
    #[error("Index store error at {path}: {message}")]
    IndexStore { path: String, message: String },

    /// Committed index snapshot could not be read
    #[error("Failed to load index from {path}: {message}")]
    IndexLoad { path: String, message: String },

    /// Query contains nothing searchable
    #[error("Query '{query}' has no searchable terms")]
    QueryParse { query: String },

    /// Update was cancelled between files; nothing was committed
    #[error("Index update cancelled")]
    Cancelled,

    /// File watcher could not be started
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Background indexing worker is no longer running
    #[error("Indexing worker stopped")]
    WorkerStopped,

    /// Directory does not exist
    #[error("Directory does not exist: {0}")]
    DirNotFound(String),

    /// Argument validation error
    #[error("{0}")]
    InvalidArgs(String),
}

impl SearchError {
    pub(crate) fn index_store(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        SearchError::IndexStore {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = SearchError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_configuration_display() {
        let err = SearchError::Configuration {
            path: "/readonly/storage".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/readonly/storage"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_index_store_helper() {
        let err = SearchError::index_store(std::path::Path::new("/idx/abc"), "lock failed");
        assert!(matches!(err, SearchError::IndexStore { .. }));
        assert!(err.to_string().contains("/idx/abc"));
        assert!(err.to_string().contains("lock failed"));
    }

    #[test]
    fn test_query_parse_display() {
        let err = SearchError::QueryParse { query: "?!".to_string() };
        assert!(err.to_string().contains("?!"));
        assert!(err.to_string().contains("no searchable terms"));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let search_err: SearchError = io_err.into();
        assert!(matches!(search_err, SearchError::Io(_)));
    }
}
