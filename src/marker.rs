//! Completion marker for the build procedure.
//!
//! The marker's existence is the whole record: it is written as the last
//! action of a successful run and never touched again by this crate.
//! Operators delete it by hand to force re-provisioning.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::fs::FileSystemOperations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerStatus {
    AlreadyDone,
    NotDone,
}

pub fn check(fs: &dyn FileSystemOperations, marker_path: &Path) -> MarkerStatus {
    let status = if fs.exists(marker_path) {
        MarkerStatus::AlreadyDone
    } else {
        MarkerStatus::NotDone
    };
    debug!(marker = %marker_path.display(), ?status, "Checked completion marker");
    status
}

pub fn is_complete(fs: &dyn FileSystemOperations, marker_path: &Path) -> bool {
    check(fs, marker_path) == MarkerStatus::AlreadyDone
}

/// Create the marker and its parent directory.
///
/// The file body is informational only; nothing reads it back.
pub async fn mark_complete(
    fs: &dyn FileSystemOperations,
    marker_path: &Path,
    note: &str,
) -> Result<()> {
    if let Some(parent) = marker_path.parent() {
        fs.create_dir_all(parent).await?;
    }
    let body = format!("{note} completed at {}\n", Utc::now().to_rfc3339());
    fs.write(marker_path, body.as_bytes()).await?;
    info!(marker = %marker_path.display(), "Wrote completion marker");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MockFileSystemOperations, StandardFileSystem};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_check_reports_status_from_existence() {
        let marker = PathBuf::from("/var/tmp/srsran/srs-setup-complete");
        let mut mock_fs = MockFileSystemOperations::new();
        let expected = marker.clone();
        mock_fs
            .expect_exists()
            .withf(move |path: &Path| path == expected)
            .times(1)
            .return_const(true);

        assert_eq!(check(&mock_fs, &marker), MarkerStatus::AlreadyDone);
    }

    #[tokio::test]
    async fn test_mark_complete_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("nested/src/srs-setup-complete");

        assert!(!is_complete(&StandardFileSystem, &marker));
        mark_complete(&StandardFileSystem, &marker, "srsRAN release_22_04")
            .await
            .unwrap();

        assert!(is_complete(&StandardFileSystem, &marker));
        let body = std::fs::read_to_string(&marker).unwrap();
        assert!(body.starts_with("srsRAN release_22_04 completed at"));
    }

    #[tokio::test]
    async fn test_failed_write_propagates() {
        let mut mock_fs = MockFileSystemOperations::new();
        mock_fs.expect_create_dir_all().returning(|_| Ok(()));
        mock_fs
            .expect_write()
            .returning(|_, _| Err(anyhow::anyhow!("read-only file system")));

        let result = mark_complete(&mock_fs, Path::new("/ro/marker"), "srsRAN").await;
        assert!(result.is_err());
    }
}
