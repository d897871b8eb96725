//! Serialized appends to the active log file
//!
//! A single writer task owns every append. Callers enqueue synchronously, so
//! lines land in the order `append` was called, and at most one append runs
//! against the file at any time. A failed line is dropped and reported; it
//! never holds up the lines queued behind it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::error::LogError;
use crate::storage::{encode_fallback, Encoding};

use super::session::SessionManager;

enum WriterRequest {
    Append {
        line: String,
        done: oneshot::Sender<()>,
    },
    Flush(oneshot::Sender<()>),
}

/// Completion of one queued line
///
/// Resolves once the write was attempted, whatever the outcome. Resolves
/// immediately for lines that were never queued.
#[must_use = "the line is already queued; await this only to wait for the write"]
pub struct PendingWrite(Option<oneshot::Receiver<()>>);

impl PendingWrite {
    /// A completion for a line that was filtered out or otherwise not queued
    pub fn skipped() -> Self {
        Self(None)
    }
}

impl Future for PendingWrite {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.0.as_mut() {
            Some(finished) => Pin::new(finished).poll(cx).map(|_| ()),
            None => Poll::Ready(()),
        }
    }
}

/// Handle to the writer task
#[derive(Clone)]
pub struct WriteSerializer {
    tx: mpsc::UnboundedSender<WriterRequest>,
}

impl WriteSerializer {
    /// Start the writer task on the current tokio runtime
    pub fn spawn(session: Arc<SessionManager>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(session, rx));
        Self { tx }
    }

    /// Queue `line` for appending
    ///
    /// The line is queued before this returns. Awaiting the returned future
    /// waits for this line's write attempt; dropping it is fine too.
    pub fn append(&self, line: impl Into<String>) -> PendingWrite {
        let (done, finished) = oneshot::channel();
        let request = WriterRequest::Append {
            line: line.into(),
            done,
        };
        if self.tx.send(request).is_err() {
            tracing::warn!("Log writer has stopped, dropping line");
            return PendingWrite::skipped();
        }
        PendingWrite(Some(finished))
    }

    /// Wait until every line queued so far has been attempted
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        if self.tx.send(WriterRequest::Flush(done)).is_ok() {
            let _ = finished.await;
        }
    }
}

async fn run_writer(session: Arc<SessionManager>, mut rx: mpsc::UnboundedReceiver<WriterRequest>) {
    while let Some(request) = rx.recv().await {
        match request {
            WriterRequest::Append { line, done } => {
                write_line(&session, &line).await;
                let _ = done.send(());
            }
            WriterRequest::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Log writer stopped");
}

async fn write_line(session: &SessionManager, line: &str) {
    if !session.ensure_initialized().await {
        return;
    }
    let storage = session.storage();

    let Some(mut path) = session.snapshot().active_file_path else {
        return;
    };
    if !storage.exists(&path).await {
        tracing::debug!(error = %LogError::FileMissing(path.clone()), "Re-initializing before write");
        session.invalidate("active file missing");
        if !session.ensure_initialized().await {
            return;
        }
        match session.snapshot().active_file_path {
            Some(fresh) => path = fresh,
            None => return,
        }
    }

    let appending = session.lock_appends().await;
    if let Err(e) = storage.append_file(&path, line, Encoding::Utf8).await {
        tracing::debug!(path = %path.display(), error = %e, "UTF-8 append failed, retrying with fallback encoding");
        if let Err(e) = storage
            .append_file(&path, &encode_fallback(line), Encoding::Base64)
            .await
        {
            drop(appending);
            let err = LogError::EncodingFailure(path);
            tracing::warn!(error = %err, cause = %e, "Dropping log line");
            session.invalidate("append failed");
            return;
        }
    }
    drop(appending);

    match storage.stat(&path).await {
        Ok(stat) if session.limits().exceeds_size(stat.size) => {
            tracing::info!(path = %path.display(), size = stat.size, "Log file over size limit, rolling over");
            session.invalidate("size limit reached");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Size check failed");
            session.invalidate("size check failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::logging::background::BackgroundTasks;
    use crate::logging::clock::FixedClock;
    use crate::logging::file_ops::FileOps;
    use crate::logging::filename::FilenamePolicy;
    use crate::logging::retention::RetentionLimits;
    use crate::logging::session::{SessionPhase, SessionSettings};
    use crate::storage::{MemoryStorage, Storage};

    const ACTIVE: &str = "/base/logs/session_2024-03-13.txt";

    fn session_with(storage: &MemoryStorage, limits: RetentionLimits) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            Arc::new(storage.clone()),
            SessionSettings {
                candidates: vec![PathBuf::from("/base")],
                policy: FilenamePolicy::default(),
                limits,
            },
            Arc::new(FixedClock::at_date(2024, 3, 13)),
            BackgroundTasks::new(),
        ))
    }

    fn body_lines(storage: &MemoryStorage) -> Vec<String> {
        storage
            .file_text(ACTIVE)
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with("==="))
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_submission_order() {
        let storage = MemoryStorage::new();
        storage.set_append_delay(Duration::from_millis(1));
        let writer = WriteSerializer::spawn(session_with(&storage, RetentionLimits::unlimited()));

        let pending: Vec<_> = (0..50)
            .map(|i| tokio::spawn(writer.append(format!("line {}\n", i))))
            .collect();
        for handle in pending {
            handle.await.unwrap();
        }

        let expected: Vec<String> = (0..50).map(|i| format!("line {}", i)).collect();
        assert_eq!(body_lines(&storage), expected);
        assert_eq!(storage.max_appends_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_dropped_future_still_writes() {
        let storage = MemoryStorage::new();
        let writer = WriteSerializer::spawn(session_with(&storage, RetentionLimits::unlimited()));

        drop(writer.append("fire and forget\n"));
        writer.flush().await;

        assert_eq!(body_lines(&storage), vec!["fire and forget".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_encoding_used_when_utf8_fails() {
        let storage = MemoryStorage::new();
        let session = session_with(&storage, RetentionLimits::unlimited());
        assert!(session.ensure_initialized().await);
        storage.fail_appends(Encoding::Utf8);
        let writer = WriteSerializer::spawn(Arc::clone(&session));

        writer.append("héllo wörld ✓\n").await;

        assert_eq!(body_lines(&storage), vec!["héllo wörld ✓".to_string()]);
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn test_both_encodings_failing_drops_line_and_invalidates() {
        let storage = MemoryStorage::new();
        let session = session_with(&storage, RetentionLimits::unlimited());
        assert!(session.ensure_initialized().await);
        storage.fail_appends(Encoding::Utf8);
        storage.fail_appends(Encoding::Base64);
        let writer = WriteSerializer::spawn(Arc::clone(&session));

        writer.append("lost\n").await;
        assert!(body_lines(&storage).is_empty());
        assert_eq!(session.phase(), SessionPhase::Invalidated);

        // The chain keeps going once storage recovers
        storage.clear_faults();
        writer.append("kept\n").await;
        assert_eq!(body_lines(&storage), vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn test_deleted_file_is_recreated_before_write() {
        let storage = MemoryStorage::new();
        let session = session_with(&storage, RetentionLimits::unlimited());
        let writer = WriteSerializer::spawn(Arc::clone(&session));

        writer.append("first\n").await;
        storage.remove_file(ACTIVE);
        writer.append("second\n").await;

        let content = storage.file_text(ACTIVE).unwrap();
        assert!(content.contains("New Log Session Started"));
        assert_eq!(body_lines(&storage), vec!["second".to_string()]);
    }

    #[tokio::test]
    async fn test_oversized_file_invalidates_after_write() {
        let storage = MemoryStorage::new();
        storage.insert_file(ACTIVE, vec![b'x'; 1024 * 1024]);
        let limits = RetentionLimits {
            max_file_count: 0,
            max_age_days: 0,
            max_size_mb: 1.0,
        };
        let session = session_with(&storage, limits);
        let writer = WriteSerializer::spawn(Arc::clone(&session));

        writer.append("tips it over\n").await;

        assert_eq!(session.phase(), SessionPhase::Invalidated);
        // The oversized file is left in place, not rotated mid-write
        assert!(storage.file_text(ACTIVE).unwrap().ends_with("tips it over\n"));
    }

    #[tokio::test]
    async fn test_reinit_marker_waits_for_in_flight_append() {
        let storage = MemoryStorage::new();
        let session = session_with(&storage, RetentionLimits::unlimited());
        assert!(session.ensure_initialized().await);
        storage.set_append_delay(Duration::from_millis(50));
        let writer = WriteSerializer::spawn(Arc::clone(&session));
        let ops = FileOps::new(Arc::clone(&session));

        let slow = writer.append("slow line\n");
        tokio::time::sleep(Duration::from_millis(10)).await;
        ops.reset_session().await;
        ops.list_files().await;
        slow.await;

        assert_eq!(storage.max_appends_in_flight(), 1);
        let content = storage.file_text(ACTIVE).unwrap();
        let line_at = content.find("slow line\n").unwrap();
        let marker_at = content.find("=== App Session Resumed").unwrap();
        assert!(line_at < marker_at);
    }

    #[tokio::test]
    async fn test_fallback_written_line_reads_back_exactly() {
        let storage = MemoryStorage::new();
        let session = session_with(&storage, RetentionLimits::unlimited());
        assert!(session.ensure_initialized().await);
        let writer = WriteSerializer::spawn(Arc::clone(&session));
        let ops = FileOps::new(Arc::clone(&session));
        let line = "grüße 日本語 ✓ 🚀\n";

        storage.fail_appends(Encoding::Utf8);
        writer.append(line).await;
        storage.fail_reads(Encoding::Utf8);

        let content = ops.read_file("session_2024-03-13.txt").await.unwrap();
        assert_eq!(
            content,
            format!(
                "\n=== New Log Session Started at 2024-03-13 12:00:00.000 ===\n{}",
                line
            )
        );
        assert!(storage
            .calls()
            .contains(&crate::storage::StorageCall::Append(PathBuf::from(ACTIVE), Encoding::Base64)));
    }

    #[tokio::test]
    async fn test_no_storage_drops_silently() {
        let storage = MemoryStorage::new();
        storage.make_read_only("/base");
        let writer = WriteSerializer::spawn(session_with(&storage, RetentionLimits::unlimited()));

        writer.append("nowhere\n").await;

        assert_eq!(storage.append_calls(), 0);
        assert!(!storage.exists(std::path::Path::new(ACTIVE)).await);
    }
}
