use std::io;
use thiserror::Error;

/// Failures reported by a [`RemoteStore`](crate::store::RemoteStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The path vanished or never existed.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Network or throttling failure that outlived the backend's own retries.
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    #[error("folder is not empty: {0}")]
    NonEmptyDirectory(String),

    #[error("invalid path or name: {0:?}")]
    InvalidPath(String),

    #[error("store error: {0}")]
    Backend(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_non_empty(&self) -> bool {
        matches!(self, StoreError::NonEmptyDirectory(_))
    }

    /// Map an I/O error on `path` onto the store taxonomy.
    pub fn from_io(path: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(path.to_string()),
            _ => StoreError::Io {
                path: path.to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_taxonomy() {
        let err = StoreError::from_io("/a", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = StoreError::from_io("/a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, StoreError::PermissionDenied(p) if p == "/a"));

        let err = StoreError::from_io("/a", io::Error::from(io::ErrorKind::Other));
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
