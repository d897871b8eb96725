//! In-memory storage with fault injection for tests

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{Encoding, FileKind, FileStat, Storage};

/// A recorded mutating call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Mkdir(PathBuf),
    Write(PathBuf, Encoding),
    Append(PathBuf, Encoding),
    Unlink(PathBuf),
}

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    calls: Vec<StorageCall>,
    failing_appends: HashSet<Encoding>,
    failing_reads: HashSet<Encoding>,
    failing_stats: HashSet<PathBuf>,
    failing_unlinks: HashSet<PathBuf>,
    read_only_dirs: HashSet<PathBuf>,
    append_delay: Option<Duration>,
    appends_in_flight: usize,
    max_appends_in_flight: usize,
}

/// [`Storage`] kept entirely in memory
///
/// Clones share state, so a test can hand one clone to the logger and keep
/// another to inspect files and inject failures.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryState>>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file: {}", path.display()),
    )
}

fn denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("read-only: {}", path.display()),
    )
}

impl MemoryState {
    fn is_read_only(&self, path: &Path) -> bool {
        self.read_only_dirs.iter().any(|dir| path.starts_with(dir))
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.dirs.contains(parent),
            _ => true,
        }
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        if self.is_read_only(path) {
            return Err(denied(path));
        }
        if !self.parent_exists(path) {
            return Err(not_found(path));
        }
        Ok(())
    }

    fn add_dir_all(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the state from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Put a file in place without recording a call
    pub fn insert_file(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            state.add_dir_all(parent);
        }
        state.files.insert(path.to_path_buf(), content.as_ref().to_vec());
    }

    /// Remove a file out-of-band, without recording a call
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.state().files.remove(path.as_ref());
    }

    pub fn file_bytes(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state().files.get(path.as_ref()).cloned()
    }

    pub fn file_text(&self, path: impl AsRef<Path>) -> Option<String> {
        self.file_bytes(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.state().files.contains_key(path.as_ref())
    }

    /// Names of all files directly inside `dir`
    pub fn file_names(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let dir = dir.as_ref();
        self.state()
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect()
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.state().calls.clone()
    }

    /// Number of append calls, successful or not
    pub fn append_calls(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, StorageCall::Append(..)))
            .count()
    }

    pub fn unlink_calls(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, StorageCall::Unlink(..)))
            .count()
    }

    /// Highest number of appends observed running at the same time
    pub fn max_appends_in_flight(&self) -> usize {
        self.state().max_appends_in_flight
    }

    pub fn fail_appends(&self, encoding: Encoding) {
        self.state().failing_appends.insert(encoding);
    }

    pub fn fail_reads(&self, encoding: Encoding) {
        self.state().failing_reads.insert(encoding);
    }

    pub fn fail_stat(&self, path: impl AsRef<Path>) {
        self.state()
            .failing_stats
            .insert(path.as_ref().to_path_buf());
    }

    pub fn fail_unlink(&self, path: impl AsRef<Path>) {
        self.state()
            .failing_unlinks
            .insert(path.as_ref().to_path_buf());
    }

    /// Reject every mkdir/write/append under `dir`
    pub fn make_read_only(&self, dir: impl AsRef<Path>) {
        self.state()
            .read_only_dirs
            .insert(dir.as_ref().to_path_buf());
    }

    pub fn clear_faults(&self) {
        let mut state = self.state();
        state.failing_appends.clear();
        state.failing_reads.clear();
        state.failing_stats.clear();
        state.failing_unlinks.clear();
        state.read_only_dirs.clear();
    }

    /// Hold every append open for `delay` so overlapping writers would show up
    pub fn set_append_delay(&self, delay: Duration) {
        self.state().append_delay = Some(delay);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &Path) -> bool {
        let state = self.state();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state();
        state.calls.push(StorageCall::Mkdir(path.to_path_buf()));
        if state.is_read_only(path) {
            return Err(denied(path));
        }
        state.add_dir_all(path);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let state = self.state();
        if state.failing_stats.contains(path) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected stat failure"));
        }
        if let Some(bytes) = state.files.get(path) {
            return Ok(FileStat {
                size: bytes.len() as u64,
                kind: FileKind::File,
            });
        }
        if state.dirs.contains(path) {
            return Ok(FileStat {
                size: 0,
                kind: FileKind::Directory,
            });
        }
        Err(not_found(path))
    }

    async fn ls(&self, dir: &Path) -> io::Result<Vec<String>> {
        let state = self.state();
        if !state.dirs.contains(dir) {
            return Err(not_found(dir));
        }
        let files = state.files.keys();
        let dirs = state.dirs.iter();
        Ok(files
            .chain(dirs)
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect())
    }

    async fn read_file(&self, path: &Path, encoding: Encoding) -> io::Result<String> {
        let bytes = {
            let state = self.state();
            if state.failing_reads.contains(&encoding) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "injected read failure",
                ));
            }
            state.files.get(path).cloned().ok_or_else(|| not_found(path))?
        };
        encoding.from_bytes(bytes)
    }

    async fn write_file(&self, path: &Path, content: &str, encoding: Encoding) -> io::Result<()> {
        let mut state = self.state();
        state.calls.push(StorageCall::Write(path.to_path_buf(), encoding));
        state.check_writable(path)?;
        let bytes = encoding.to_bytes(content)?;
        state.files.insert(path.to_path_buf(), bytes);
        Ok(())
    }

    async fn append_file(&self, path: &Path, content: &str, encoding: Encoding) -> io::Result<()> {
        let delay = {
            let mut state = self.state();
            state.calls.push(StorageCall::Append(path.to_path_buf(), encoding));
            state.appends_in_flight += 1;
            state.max_appends_in_flight = state.max_appends_in_flight.max(state.appends_in_flight);
            state.append_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.appends_in_flight -= 1;
        if state.failing_appends.contains(&encoding) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "injected append failure",
            ));
        }
        state.check_writable(path)?;
        let bytes = encoding.to_bytes(content)?;
        state
            .files
            .entry(path.to_path_buf())
            .or_default()
            .extend_from_slice(&bytes);
        Ok(())
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state();
        state.calls.push(StorageCall::Unlink(path.to_path_buf()));
        if state.failing_unlinks.contains(path) || state.is_read_only(path) {
            return Err(denied(path));
        }
        state.files.remove(path).map(|_| ()).ok_or_else(|| not_found(path))
    }
}
