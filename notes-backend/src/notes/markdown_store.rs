//! File-backed store: the markdown document is the only copy of the notes.
//!
//! Every operation reads and decodes the whole file, mutates in memory and
//! rewrites the whole file. One mutex serialises the read-mutate-write cycle.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use super::backup::BackupRotation;
use super::related::{self, Scoring};
use super::store::{import_failure, prepare_candidate, ImportReport, NoteDraft, NoteStore};
use super::timestamp::TimestampGenerator;
use super::{codec, file_ops};
use crate::error::{NoteError, NoteResult};
use notes_types::{ImportCandidate, Note, RelatedNote};

pub struct MarkdownNoteStore {
    path: PathBuf,
    backups: BackupRotation,
    timestamps: Arc<TimestampGenerator>,
    lock: Mutex<()>,
}

impl MarkdownNoteStore {
    /// Open the store, creating the document with just a header if missing
    pub fn open(
        path: PathBuf,
        backups: BackupRotation,
        timestamps: Arc<TimestampGenerator>,
    ) -> NoteResult<Self> {
        if file_ops::ensure_document(&path)? {
            log::info!("[NOTES] Created empty notes document at {}", path.display());
        }

        Ok(Self {
            path,
            backups,
            timestamps,
            lock: Mutex::new(()),
        })
    }

    /// Newest-first
    fn load(&self) -> NoteResult<Vec<Note>> {
        let content = file_ops::read_document(&self.path)?;
        Ok(codec::decode(&content))
    }

    fn save(&self, newest_first: &[Note]) -> NoteResult<()> {
        file_ops::write_document(&self.path, &codec::encode_newest_first(newest_first))?;
        Ok(())
    }

    fn insert(&self, notes: &mut Vec<Note>, draft: NoteDraft, candidate: Option<&str>) -> NoteResult<Note> {
        let timestamp = self.timestamps.issue(candidate);
        if notes.iter().any(|n| n.timestamp == timestamp) {
            return Err(NoteError::conflict(&timestamp));
        }

        let note = draft.into_note(timestamp);
        notes.insert(0, note.clone());
        Ok(note)
    }
}

impl NoteStore for MarkdownNoteStore {
    fn backend_name(&self) -> &'static str {
        "markdown"
    }

    fn list(&self) -> NoteResult<Vec<Note>> {
        let _guard = self.lock.lock();
        self.load()
    }

    fn get(&self, timestamp: &str) -> NoteResult<Note> {
        let _guard = self.lock.lock();
        self.load()?
            .into_iter()
            .find(|n| n.timestamp == timestamp)
            .ok_or_else(NoteError::not_found)
    }

    fn create(&self, question: &str, answer: &str, tags: Option<&[String]>) -> NoteResult<Note> {
        let draft = NoteDraft::new(question, answer, tags)?;

        let _guard = self.lock.lock();
        let mut notes = self.load()?;
        let note = self.insert(&mut notes, draft, None)?;
        self.save(&notes)?;

        log::info!("[NOTES] Created note {}", note.timestamp);
        Ok(note)
    }

    fn update(
        &self,
        timestamp: &str,
        question: &str,
        answer: &str,
        tags: Option<&[String]>,
    ) -> NoteResult<Note> {
        let draft = NoteDraft::new(question, answer, tags)?;

        let _guard = self.lock.lock();
        self.backups.snapshot(&self.path);

        let mut notes = self.load()?;
        let existing = notes
            .iter_mut()
            .find(|n| n.timestamp == timestamp)
            .ok_or_else(NoteError::not_found)?;

        existing.question = draft.question;
        existing.answer = draft.answer;
        existing.tags = draft.tags;
        let updated = existing.clone();

        self.save(&notes)?;
        log::info!("[NOTES] Updated note {}", timestamp);
        Ok(updated)
    }

    fn delete(&self, timestamp: &str) -> NoteResult<()> {
        let _guard = self.lock.lock();
        self.backups.snapshot(&self.path);

        let mut notes = self.load()?;
        let before = notes.len();
        notes.retain(|n| n.timestamp != timestamp);
        if notes.len() == before {
            return Err(NoteError::not_found());
        }

        self.save(&notes)?;
        log::info!("[NOTES] Deleted note {}", timestamp);
        Ok(())
    }

    fn import_batch(&self, candidates: &[ImportCandidate]) -> NoteResult<ImportReport> {
        let _guard = self.lock.lock();
        let mut notes = self.load()?;
        let mut report = ImportReport::default();

        for (index, candidate) in candidates.iter().enumerate() {
            let position = index + 1;
            let (draft, timestamp) = match prepare_candidate(position, candidate) {
                Ok(prepared) => prepared,
                Err(msg) => {
                    report.errors.push(msg);
                    continue;
                }
            };

            match self.insert(&mut notes, draft, timestamp.as_deref()) {
                Ok(note) => report.imported.push(note),
                Err(e) => report.errors.push(import_failure(position, &e)),
            }
        }

        if !report.imported.is_empty() {
            self.save(&notes)?;
        }

        log::info!(
            "[NOTES] Imported {} notes ({} rejected)",
            report.imported_count(),
            report.errors.len()
        );
        Ok(report)
    }

    fn related_to(&self, timestamp: &str) -> NoteResult<Vec<RelatedNote>> {
        let notes = self.list()?;
        let target = notes
            .iter()
            .find(|n| n.timestamp == timestamp)
            .ok_or_else(NoteError::not_found)?;

        Ok(related::rank(target, &notes, Scoring::TagsWithSameDay))
    }

    fn export_markdown(&self) -> NoteResult<String> {
        let _guard = self.lock.lock();
        Ok(file_ops::read_document(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::timestamp::test_support::{reference_instant, shanghai, FixedClock};
    use chrono::Duration;
    use tempfile::{tempdir, TempDir};

    fn open_store() -> (TempDir, Arc<FixedClock>, MarkdownNoteStore) {
        let dir = tempdir().unwrap();
        let clock = FixedClock::at(reference_instant());
        let timestamps = Arc::new(TimestampGenerator::with_clock(shanghai(), clock.clone()));
        let store = MarkdownNoteStore::open(
            dir.path().join("notes.md"),
            BackupRotation::new(dir.path().join("backups"), 10),
            timestamps,
        )
        .expect("Failed to open store");
        (dir, clock, store)
    }

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_create_then_list() {
        let (_dir, _clock, store) = open_store();

        let note = store
            .create("What is TCP?", "A transport protocol.", Some(&tags(&["networking"])))
            .unwrap();
        assert_eq!(note.timestamp, "2026/02/01 21:59:40");

        let notes = store.list().unwrap();
        assert_eq!(notes, vec![note]);
    }

    #[test]
    fn test_same_second_creates_get_distinct_timestamps() {
        let (_dir, clock, store) = open_store();

        let first = store.create("Q1", "A1", None).unwrap();
        clock.set(reference_instant() + Duration::milliseconds(250));
        let second = store.create("Q2", "A2", None).unwrap();

        assert_eq!(first.timestamp, "2026/02/01 21:59:40");
        assert_eq!(
            second.timestamp,
            format!(
                "2026/02/01 21:59:40.{}",
                (reference_instant() + Duration::milliseconds(250)).timestamp_millis()
            )
        );

        let notes = store.list().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0], second);
        assert_eq!(notes[1], first);
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        let (_dir, _clock, store) = open_store();
        assert!(matches!(store.create("  ", "a", None), Err(NoteError::Validation(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_created_note_matches_what_is_listed() {
        let (_dir, clock, store) = open_store();

        let multi_line = store.create("line one\nline two", "a", None).unwrap();
        assert_eq!(multi_line.question, "line one line two");
        clock.set(reference_instant() + Duration::seconds(1));
        let backtick = store.create("Q", "a", Some(&tags(&["a`b", "c"]))).unwrap();
        assert_eq!(backtick.tags, vec!["ab", "c"]);

        assert_eq!(store.list().unwrap(), vec![backtick, multi_line]);
    }

    #[test]
    fn test_update_keeps_timestamp_and_backs_up() {
        let (dir, _clock, store) = open_store();
        let note = store.create("Old?", "old", Some(&tags(&["a"]))).unwrap();

        let updated = store
            .update(&note.timestamp, " New? ", "new", Some(&tags(&["b", "c"])))
            .unwrap();
        assert_eq!(updated.timestamp, note.timestamp);
        assert_eq!(updated.question, "New?");

        let fetched = store.get(&note.timestamp).unwrap();
        assert_eq!(fetched, updated);
        assert_eq!(file_ops::list_backups(&dir.path().join("backups")).unwrap().len(), 1);
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let (_dir, _clock, store) = open_store();
        assert!(matches!(
            store.update("2000/01/01 00:00:00", "q", "a", None),
            Err(NoteError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_twice() {
        let (_dir, clock, store) = open_store();
        let keep = store.create("Keep", "k", None).unwrap();
        clock.set(reference_instant() + Duration::seconds(5));
        let gone = store.create("Gone", "g", None).unwrap();

        store.delete(&gone.timestamp).unwrap();
        assert_eq!(store.list().unwrap(), vec![keep]);
        assert!(matches!(store.delete(&gone.timestamp), Err(NoteError::NotFound(_))));
    }

    #[test]
    fn test_import_reports_partial_success() {
        let (_dir, clock, store) = open_store();
        let candidates = vec![
            ImportCandidate {
                question: "One".to_string(),
                answer: "1".to_string(),
                tags: Some(tags(&["x", "x"])),
                timestamp: Some("2025/01/01 08:00:00".to_string()),
            },
            ImportCandidate {
                question: "Two".to_string(),
                answer: "   ".to_string(),
                ..Default::default()
            },
            ImportCandidate {
                question: "Three".to_string(),
                answer: "3".to_string(),
                ..Default::default()
            },
        ];
        clock.set(reference_instant());

        let report = store.import_batch(&candidates).unwrap();
        assert_eq!(report.imported_count(), 2);
        assert_eq!(report.errors, vec!["第 2 条笔记缺少问题或答案".to_string()]);
        assert_eq!(report.imported[0].tags, vec!["x"]);
        assert_eq!(report.imported[0].timestamp, "2025/01/01 08:00:00");

        let notes = store.list().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].question, "Three");
        assert_eq!(notes[1].question, "One");
    }

    #[test]
    fn test_import_duplicate_timestamp_is_item_error() {
        let (_dir, _clock, store) = open_store();
        let existing = store.create("Existing", "e", None).unwrap();

        let mut clash = ImportCandidate {
            question: "Clash".to_string(),
            answer: "c".to_string(),
            tags: None,
            timestamp: Some("2024/05/05 05:05:05".to_string()),
        };
        store.import_batch(&[clash.clone()]).unwrap();

        // Not the generator's last value, so only the existing-key check catches it
        clash.timestamp = Some(existing.timestamp.clone());
        let report = store.import_batch(&[clash]).unwrap();
        assert_eq!(report.imported_count(), 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("第 1 条笔记导入失败"));
    }

    #[test]
    fn test_related_uses_same_day_bonus() {
        let (_dir, clock, store) = open_store();
        let a = store.create("A", "a", Some(&tags(&["x", "y"]))).unwrap();
        clock.set(reference_instant() + Duration::seconds(1));
        let b = store.create("B", "b", Some(&tags(&["x"]))).unwrap();
        clock.set(reference_instant() + Duration::days(3));
        store.create("C", "c", Some(&tags(&["z"]))).unwrap();

        let related = store.related_to(&a.timestamp).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].note, b);
        assert!((related[0].similarity - 0.65).abs() < 1e-9);

        assert!(matches!(
            store.related_to("1999/01/01 00:00:00"),
            Err(NoteError::NotFound(_))
        ));
    }

    #[test]
    fn test_document_is_oldest_first_on_disk() {
        let (_dir, clock, store) = open_store();
        store.create("Older", "o", None).unwrap();
        clock.set(reference_instant() + Duration::seconds(1));
        store.create("Newer", "n", None).unwrap();

        let raw = store.export_markdown().unwrap();
        let older = raw.find("## 📝 Older").unwrap();
        let newer = raw.find("## 📝 Newer").unwrap();
        assert!(older < newer);
        assert!(raw.starts_with(codec::DOCUMENT_TITLE));
    }
}
