//! Relational store backed by SQLite.
//!
//! Notes live in SQLite behind an r2d2 pool; tags live in `note_tags` keeping
//! their order. Every committed mutation queues a markdown mirror refresh.

use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::mirror::MarkdownMirror;
use super::related::{self, Scoring};
use super::store::{import_failure, prepare_candidate, ImportReport, NoteDraft, NoteStore};
use super::timestamp::TimestampGenerator;
use super::codec;
use crate::error::{NoteError, NoteResult};
use notes_types::{ImportCandidate, Note, RelatedNote};

type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    timestamp TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note_tags (
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (note_id, position)
);

CREATE INDEX IF NOT EXISTS idx_notes_timestamp ON notes(timestamp);
CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_at, id);
CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag);
";

/// Applied to every pooled connection
#[derive(Debug)]
struct ConnectionSetup;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionSetup {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }
}

pub struct SqliteNoteStore {
    pool: DbPool,
    timestamps: Arc<TimestampGenerator>,
    mirror: Option<MarkdownMirror>,
}

impl SqliteNoteStore {
    /// Open (or create) the database and, if `mirror_path` is given, write the
    /// mirror once and start the mirror worker.
    pub fn open(
        database_path: &Path,
        mirror_path: Option<PathBuf>,
        timestamps: Arc<TimestampGenerator>,
    ) -> NoteResult<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(database_path);
        let pool = Pool::builder()
            .max_size(4)
            .connection_customizer(Box::new(ConnectionSetup))
            .build(manager)?;

        {
            let conn = pool.get()?;
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch(SCHEMA)?;
        }
        log::info!("[NOTES] SQLite store ready at {}", database_path.display());

        let mirror = mirror_path.map(|path| {
            let snapshot_pool = pool.clone();
            MarkdownMirror::start(
                path,
                Box::new(move || {
                    let conn = snapshot_pool.get()?;
                    query_notes(&conn, "", &[])
                }),
            )
        });

        Ok(Self {
            pool,
            timestamps,
            mirror,
        })
    }

    fn refresh_mirror(&self) {
        if let Some(mirror) = &self.mirror {
            mirror.request();
        }
    }
}

/// Fixed-width so `created_at` sorts lexically
fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Load notes matching `filter` (a `WHERE ...` fragment or empty), newest-first
fn query_notes(conn: &Connection, filter: &str, args: &[&dyn ToSql]) -> NoteResult<Vec<Note>> {
    let sql = format!(
        "SELECT id, question, answer, timestamp FROM notes {} ORDER BY created_at DESC, id DESC",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(args, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Note {
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    tags: Vec::new(),
                    timestamp: row.get(3)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tag_stmt =
        conn.prepare_cached("SELECT tag FROM note_tags WHERE note_id = ?1 ORDER BY position")?;
    let mut notes = Vec::with_capacity(rows.len());
    for (id, mut note) in rows {
        note.tags = tag_stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        notes.push(note);
    }

    Ok(notes)
}

fn find_id(conn: &Connection, timestamp: &str) -> NoteResult<i64> {
    conn.query_row(
        "SELECT id FROM notes WHERE timestamp = ?1",
        [timestamp],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(NoteError::not_found)
}

fn write_tags(conn: &Connection, note_id: i64, tags: &[String]) -> NoteResult<()> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO note_tags (note_id, position, tag) VALUES (?1, ?2, ?3)")?;
    for (position, tag) in tags.iter().enumerate() {
        stmt.execute(params![note_id, position as i64, tag])?;
    }
    Ok(())
}

fn insert_note(conn: &Connection, draft: NoteDraft, timestamp: String) -> NoteResult<Note> {
    let now = now_string();
    conn.execute(
        "INSERT INTO notes (question, answer, timestamp, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![draft.question, draft.answer, timestamp, now],
    )
    .map_err(|e| match NoteError::from(e) {
        NoteError::Conflict(_) => NoteError::conflict(&timestamp),
        other => other,
    })?;

    let id = conn.last_insert_rowid();
    write_tags(conn, id, &draft.tags)?;
    Ok(draft.into_note(timestamp))
}

impl NoteStore for SqliteNoteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn list(&self) -> NoteResult<Vec<Note>> {
        let conn = self.pool.get()?;
        query_notes(&conn, "", &[])
    }

    fn get(&self, timestamp: &str) -> NoteResult<Note> {
        let conn = self.pool.get()?;
        query_notes(&conn, "WHERE timestamp = ?1", &[&timestamp])?
            .pop()
            .ok_or_else(NoteError::not_found)
    }

    fn create(&self, question: &str, answer: &str, tags: Option<&[String]>) -> NoteResult<Note> {
        let draft = NoteDraft::new(question, answer, tags)?;

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let note = insert_note(&tx, draft, self.timestamps.next())?;
        tx.commit()?;

        log::info!("[NOTES] Created note {}", note.timestamp);
        self.refresh_mirror();
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

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let id = find_id(&tx, timestamp)?;
        tx.execute(
            "UPDATE notes SET question = ?1, answer = ?2, updated_at = ?3 WHERE id = ?4",
            params![draft.question, draft.answer, now_string(), id],
        )?;
        tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])?;
        write_tags(&tx, id, &draft.tags)?;
        tx.commit()?;

        log::info!("[NOTES] Updated note {}", timestamp);
        self.refresh_mirror();
        Ok(draft.into_note(timestamp.to_string()))
    }

    fn delete(&self, timestamp: &str) -> NoteResult<()> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM notes WHERE timestamp = ?1", [timestamp])?;
        if removed == 0 {
            return Err(NoteError::not_found());
        }

        log::info!("[NOTES] Deleted note {}", timestamp);
        self.refresh_mirror();
        Ok(())
    }

    fn import_batch(&self, candidates: &[ImportCandidate]) -> NoteResult<ImportReport> {
        let mut conn = self.pool.get()?;
        let mut tx = conn.transaction()?;
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

            // Each entry gets its own savepoint so one failure rolls back
            // only that entry
            let sp = tx.savepoint()?;
            match insert_note(&sp, draft, self.timestamps.issue(timestamp.as_deref())) {
                Ok(note) => {
                    sp.commit()?;
                    report.imported.push(note);
                }
                Err(e) => report.errors.push(import_failure(position, &e)),
            }
        }
        tx.commit()?;

        log::info!(
            "[NOTES] Imported {} notes ({} rejected)",
            report.imported_count(),
            report.errors.len()
        );
        if !report.imported.is_empty() {
            self.refresh_mirror();
        }
        Ok(report)
    }

    fn related_to(&self, timestamp: &str) -> NoteResult<Vec<RelatedNote>> {
        let conn = self.pool.get()?;
        let target = query_notes(&conn, "WHERE timestamp = ?1", &[&timestamp])?
            .pop()
            .ok_or_else(NoteError::not_found)?;
        if target.tags.is_empty() {
            return Ok(Vec::new());
        }

        // Only notes sharing at least one tag can score above zero
        let placeholders = (0..target.tags.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let filter = format!(
            "WHERE timestamp != ?1 AND id IN (SELECT note_id FROM note_tags WHERE tag IN ({}))",
            placeholders
        );
        let mut args: Vec<&dyn ToSql> = vec![&target.timestamp];
        args.extend(target.tags.iter().map(|t| t as &dyn ToSql));

        let candidates = query_notes(&conn, &filter, &args)?;
        Ok(related::rank(&target, &candidates, Scoring::TagsOnly))
    }

    fn export_markdown(&self) -> NoteResult<String> {
        Ok(codec::encode_newest_first(&self.list()?))
    }
}
