//! Markdown mirror of the relational store.
//!
//! After each committed mutation the store asks for a regeneration. Requests
//! are queued on a channel and a single worker thread drains everything
//! pending before writing once, so bursts collapse into one write.
//! Mirror failures are logged and never reach the caller.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::{codec, file_ops};
use crate::error::NoteResult;
use notes_types::Note;

/// Loads the full collection, newest-first
pub type SnapshotFn = Box<dyn Fn() -> NoteResult<Vec<Note>> + Send + 'static>;

pub struct MarkdownMirror {
    path: PathBuf,
    tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl MarkdownMirror {
    /// Regenerate once synchronously, then start the background worker
    pub fn start(path: PathBuf, snapshot: SnapshotFn) -> Self {
        regenerate(&path, &snapshot);

        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();
        let worker = thread::Builder::new()
            .name("notes-mirror".to_string())
            .spawn(move || run_worker(worker_path, snapshot, rx));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("[MIRROR] Failed to start mirror worker: {}", e);
                None
            }
        };

        Self { path, tx, worker }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a regeneration. Never blocks.
    pub fn request(&self) {
        if self.tx.send(()).is_err() {
            log::warn!("[MIRROR] Worker is gone, mirror not refreshed");
        }
    }
}

impl Drop for MarkdownMirror {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once it has flushed
        let (closed, _) = mpsc::channel();
        self.tx = closed;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(path: PathBuf, snapshot: SnapshotFn, rx: Receiver<()>) {
    while rx.recv().is_ok() {
        let mut coalesced = 0usize;
        while rx.try_recv().is_ok() {
            coalesced += 1;
        }
        if coalesced > 0 {
            log::debug!("[MIRROR] Coalesced {} pending requests", coalesced);
        }
        regenerate(&path, &snapshot);
    }
    log::debug!("[MIRROR] Worker stopped");
}

/// Write the mirror from a fresh snapshot. Errors are logged.
pub fn regenerate(path: &Path, snapshot: &SnapshotFn) {
    let result = snapshot().and_then(|notes| {
        file_ops::write_document(path, &codec::encode_newest_first(&notes))?;
        Ok(notes.len())
    });

    match result {
        Ok(count) => log::debug!("[MIRROR] Wrote {} notes to {}", count, path.display()),
        Err(e) => log::error!("[MIRROR] Failed to regenerate {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn note(question: &str, timestamp: &str) -> Note {
        Note {
            question: question.to_string(),
            answer: "a".to_string(),
            tags: vec![],
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_start_writes_synchronously() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");

        let mirror = MarkdownMirror::start(
            path.clone(),
            Box::new(|| Ok(vec![note("Hello", "2026/01/01 10:00:00")])),
        );

        let content = std::fs::read_to_string(mirror.path()).unwrap();
        assert!(content.contains("## 📝 Hello"));
    }

    #[test]
    fn test_requests_are_flushed_before_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let mirror = MarkdownMirror::start(
            path.clone(),
            Box::new(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![note(&format!("Version {}", n), "2026/01/01 10:00:00")])
            }),
        );
        for _ in 0..20 {
            mirror.request();
        }
        drop(mirror);

        let total = calls.load(Ordering::SeqCst);
        // one startup write, then at least one and at most 20 worker writes
        assert!((2..=21).contains(&total));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(&format!("Version {}", total - 1)));
    }

    #[test]
    fn test_snapshot_failure_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "previous").unwrap();

        let snapshot: SnapshotFn = Box::new(|| Err(NoteError::Storage("db down".to_string())));
        regenerate(&path, &snapshot);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
    }
}
