//! Filesystem collaborator.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// File access used by the sync loop.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Read a whole file.
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a whole file, creating parent directories.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// List regular files under `root`, recursively and sorted. A root that
    /// is itself a file lists as that file; a missing root lists as empty.
    async fn list_files(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

/// [`Filesystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, contents).await
    }

    async fn list_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let metadata = match tokio::fs::metadata(root).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        if metadata.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
