//! Error handling for the download manager.
//!
//! Every fallible operation in the crate returns [`Result`]. None of these
//! errors are fatal to the host: the manager logs them, reflects them in the
//! affected session's snapshot, or hands them back to the caller of a command.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::engine::TransferId;

/// Errors that can happen while managing downloads.
#[derive(Error, Debug)]
pub enum Error {
    /// The URL cannot be parsed or does not use the HTTP(S) scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The file name would escape the destination directory or is empty.
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    /// I/O Error.
    ///
    /// Raised while preparing the destination directory or removing stale
    /// leftovers of a previous attempt.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error raised by the HTTP middleware stack (retries, tracing).
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// Another active download already writes to, or promotes into, this path.
    #[error("{} is in use by another download", .0.display())]
    PathInUse(PathBuf),

    /// The staged file could not be promoted to its destination name.
    ///
    /// The transfer itself succeeded, so the session stays completed while the
    /// artifact is still sitting at `staging`.
    #[error("failed to promote {} to {}", .staging.display(), .destination.display())]
    Finalize {
        staging: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The engine started a transfer that no armed request is waiting for.
    #[error("transfer {0} started without an armed request")]
    UnboundTransfer(TransferId),

    /// The manager event loop is no longer running.
    #[error("download manager is not running")]
    ManagerClosed,
}

/// Result type alias for operations that can fail with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_error_names_both_paths() {
        let err = Error::Finalize {
            staging: PathBuf::from("/models/a.bin.download"),
            destination: PathBuf::from("/models/a.bin"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let message = err.to_string();
        assert!(message.contains("/models/a.bin.download"));
        assert!(message.ends_with("/models/a.bin"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = io::Error::from(io::ErrorKind::NotFound).into();
        assert!(matches!(err, Error::IOError { .. }));
    }
}
