//! Promotion of a completed staging file to its destination name.
//!
//! The promotion is the only point where the destination path appears, so a
//! reader never observes a partially written model file.

use crate::error::{Error, Result};

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Atomically moves `staging` to `destination`.
///
/// Fails if `destination` already exists: an unrelated file showed up while
/// the transfer was running and must not be clobbered. The destination is
/// claimed with a hard link, which fails instead of replacing an existing
/// file, and the staging name is removed afterwards. On filesystems without
/// hard links this degrades to an existence check followed by a rename, which
/// leaves a short window where a file created in between gets replaced.
/// Either way the move only works within one filesystem.
pub async fn finalize(staging: &Path, destination: &Path) -> Result<()> {
    let finalize_error = |source: io::Error| Error::Finalize {
        staging: staging.to_path_buf(),
        destination: destination.to_path_buf(),
        source,
    };

    debug!("Promoting {:?} to {:?}", staging, destination);
    match fs::hard_link(staging, destination).await {
        Ok(()) => {
            if let Err(e) = fs::remove_file(staging).await {
                warn!(staging = ?staging, error = %e, "could not remove staging name after promotion");
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(finalize_error(e)),
        Err(e) => {
            debug!(error = %e, "hard link unavailable, falling back to rename");
            rename_if_absent(staging, destination)
                .await
                .map_err(finalize_error)
        }
    }
}

async fn rename_if_absent(staging: &Path, destination: &Path) -> io::Result<()> {
    if fs::try_exists(destination).await? {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination file already exists",
        ));
    }
    fs::rename(staging, destination).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finalize_moves_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("model.bin.download");
        let destination = dir.path().join("model.bin");
        std::fs::write(&staging, b"weights").unwrap();

        finalize(&staging, &destination).await.unwrap();

        assert!(!staging.exists());
        assert_eq!(std::fs::read(&destination).unwrap(), b"weights");
    }

    #[tokio::test]
    async fn test_finalize_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("model.bin.download");
        let destination = dir.path().join("model.bin");
        std::fs::write(&staging, b"new").unwrap();
        std::fs::write(&destination, b"old").unwrap();

        let err = finalize(&staging, &destination).await.unwrap_err();

        assert!(matches!(err, Error::Finalize { ref source, .. } if source.kind() == io::ErrorKind::AlreadyExists));
        assert_eq!(std::fs::read(&destination).unwrap(), b"old");
        assert!(staging.exists());
    }

    #[tokio::test]
    async fn test_fallback_rename_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("model.bin.download");
        let destination = dir.path().join("model.bin");
        std::fs::write(&staging, b"new").unwrap();
        std::fs::write(&destination, b"old").unwrap();

        let err = rename_if_absent(&staging, &destination).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&destination).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_finalize_missing_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("gone.bin.download");
        let destination = dir.path().join("gone.bin");

        let err = finalize(&staging, &destination).await.unwrap_err();

        assert!(matches!(err, Error::Finalize { .. }));
        assert!(!destination.exists());
    }
}
