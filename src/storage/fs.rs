//! Local filesystem storage backed by `tokio::fs`

use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{Encoding, FileKind, FileStat, Storage};

/// [`Storage`] over the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await?;
        let kind = if metadata.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        Ok(FileStat {
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            kind,
        })
    }

    async fn ls(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            // Non-UTF-8 names can never match the log file pattern
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn read_file(&self, path: &Path, encoding: Encoding) -> io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        encoding.from_bytes(bytes)
    }

    async fn write_file(&self, path: &Path, content: &str, encoding: Encoding) -> io::Result<()> {
        let bytes = encoding.to_bytes(content)?;
        tokio::fs::write(path, bytes).await
    }

    async fn append_file(&self, path: &Path, content: &str, encoding: Encoding) -> io::Result<()> {
        let bytes = encoding.to_bytes(content)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
