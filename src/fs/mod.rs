/// File system operations abstraction for testing
///
/// This module provides a trait-based abstraction over the file system
/// operations the provisioning procedures perform, so they can be mocked in
/// tests using the `mockall` crate.
///
/// # Examples
///
/// ```rust,no_run
/// use srs_provision::fs::{FileSystemOperations, StandardFileSystem};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> anyhow::Result<()> {
///     let fs_ops: Arc<dyn FileSystemOperations> = Arc::new(StandardFileSystem);
///
///     fs_ops.create_dir_all(Path::new("/var/tmp/srsran")).await?;
///     fs_ops.write(Path::new("/var/tmp/srsran/note.txt"), b"hello").await?;
///
///     if fs_ops.exists(Path::new("/var/tmp/srsran/note.txt")) {
///         println!("File was created successfully");
///     }
///
///     Ok(())
/// }
/// ```
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Trait for file system operations that can be mocked in tests
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait::async_trait]
pub trait FileSystemOperations: Send + Sync {
    /// Create a directory and all its parent directories
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write data to a file, creating the file if it doesn't exist
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a directory with at least one entry
    async fn is_non_empty_dir(&self, path: &Path) -> Result<bool>;

    /// Recursively remove a directory
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy every regular file directly inside `from` into `to`, overwriting
    /// files of the same name. Returns the destination paths written.
    async fn copy_dir_contents(&self, from: &Path, to: &Path) -> Result<Vec<PathBuf>>;
}

/// Standard implementation that uses actual file system operations
///
/// This is the production implementation of `FileSystemOperations`. Switch to
/// `MockFileSystemOperations` in tests.
pub struct StandardFileSystem;

#[async_trait::async_trait]
impl FileSystemOperations for StandardFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn is_non_empty_dir(&self, path: &Path) -> Result<bool> {
        if !path.is_dir() {
            return Ok(false);
        }
        let mut entries = tokio::fs::read_dir(path)
            .await
            .with_context(|| format!("Failed to read directory {}", path.display()))?;
        Ok(entries.next_entry().await?.is_some())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))
    }

    async fn copy_dir_contents(&self, from: &Path, to: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(from)
            .await
            .with_context(|| format!("Failed to read overlay directory {}", from.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        // Deterministic order for logs and tests
        files.sort();

        tokio::fs::create_dir_all(to)
            .await
            .with_context(|| format!("Failed to create directory {}", to.display()))?;

        let mut written = Vec::with_capacity(files.len());
        for source in files {
            let Some(name) = source.file_name() else {
                continue;
            };
            let dest = to.join(name);
            tokio::fs::copy(&source, &dest).await.with_context(|| {
                format!("Failed to copy {} to {}", source.display(), dest.display())
            })?;
            written.push(dest);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_overwrites_existing_files() {
        let dir = TempDir::new().unwrap();
        let overlay = dir.path().join("overlay");
        let installed = dir.path().join("etc/srsran");
        std::fs::create_dir_all(&overlay).unwrap();
        std::fs::create_dir_all(&installed).unwrap();
        std::fs::write(overlay.join("enb.conf"), "overlay").unwrap();
        std::fs::write(installed.join("enb.conf"), "default").unwrap();
        std::fs::write(installed.join("ue.conf"), "untouched").unwrap();

        let written = StandardFileSystem
            .copy_dir_contents(&overlay, &installed)
            .await
            .unwrap();

        assert_eq!(written, vec![installed.join("enb.conf")]);
        assert_eq!(
            std::fs::read_to_string(installed.join("enb.conf")).unwrap(),
            "overlay"
        );
        assert_eq!(
            std::fs::read_to_string(installed.join("ue.conf")).unwrap(),
            "untouched"
        );
    }

    #[tokio::test]
    async fn test_copy_skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        let overlay = dir.path().join("overlay");
        std::fs::create_dir_all(overlay.join("nested")).unwrap();
        std::fs::write(overlay.join("rr.conf"), "rr").unwrap();

        let written = StandardFileSystem
            .copy_dir_contents(&overlay, &dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(written.len(), 1);
        assert!(!dir.path().join("out/nested").exists());
    }

    #[tokio::test]
    async fn test_missing_overlay_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = StandardFileSystem
            .copy_dir_contents(&dir.path().join("missing"), &dir.path().join("out"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_is_non_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(!StandardFileSystem.is_non_empty_dir(dir.path()).await.unwrap());
        std::fs::write(dir.path().join("f"), "x").unwrap();
        assert!(StandardFileSystem.is_non_empty_dir(dir.path()).await.unwrap());
        assert!(!StandardFileSystem
            .is_non_empty_dir(&dir.path().join("missing"))
            .await
            .unwrap());
    }
}
