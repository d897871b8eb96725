//! Platform storage abstraction
//!
//! The logging core never touches the filesystem directly. Everything goes
//! through [`Storage`], which mirrors the small set of primitives a mobile or
//! desktop host exposes (exists/mkdir/stat/ls/read/write/append/unlink).

mod encoding;
mod fs;

#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use encoding::{decode_fallback, encode_fallback, Encoding};
pub use fs::FsStorage;

#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryStorage, StorageCall};

use std::io;
use std::path::Path;

use async_trait::async_trait;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// Result of a `stat` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Size in bytes (0 for directories)
    pub size: u64,
    pub kind: FileKind,
}

impl FileStat {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Storage primitives consumed by the session logger
///
/// `content` arguments and read results are text in the given [`Encoding`]:
/// under [`Encoding::Base64`] the text is base64 and the stored bytes are the
/// decoded payload.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Whether a file or directory exists at `path`
    async fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents
    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Names (not paths) of the entries directly inside `dir`
    async fn ls(&self, dir: &Path) -> io::Result<Vec<String>>;

    async fn read_file(&self, path: &Path, encoding: Encoding) -> io::Result<String>;

    /// Create or truncate `path` with `content`
    async fn write_file(&self, path: &Path, content: &str, encoding: Encoding) -> io::Result<()>;

    /// Append `content` to `path`, creating it if absent
    async fn append_file(&self, path: &Path, content: &str, encoding: Encoding) -> io::Result<()>;

    async fn unlink(&self, path: &Path) -> io::Result<()>;
}
