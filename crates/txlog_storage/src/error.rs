//! Error types for segment storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or appending segment bytes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The channel has already been closed.
    #[error("channel is closed")]
    Closed,
}

impl From<StorageError> for io::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => e,
            StorageError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_passes_through() {
        let err = StorageError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn closed_maps_to_broken_pipe() {
        let io_err: io::Error = StorageError::Closed.into();
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(io_err.to_string(), "channel is closed");
    }
}
