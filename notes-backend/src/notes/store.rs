//! The capability every storage backend implements.
//!
//! Two implementations exist: `SqliteNoteStore` (relational table plus a
//! markdown mirror) and `MarkdownNoteStore` (the markdown document is the
//! store). The server picks one at start-up and only ever sees `dyn NoteStore`.

use crate::error::{NoteError, NoteResult};
use crate::notes::codec::single_line;
use notes_types::{ImportCandidate, Note, RelatedNote, TagCount};
use std::collections::HashMap;

/// Validated, trimmed mutable fields of a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub question: String,
    pub answer: String,
    pub tags: Vec<String>,
}

impl NoteDraft {
    /// Trim fields and reject an empty question or answer
    pub fn new(question: &str, answer: &str, tags: Option<&[String]>) -> NoteResult<Self> {
        // The question is a markdown heading, so it is stored on one line
        let question = single_line(question.trim());
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return Err(NoteError::validation("问题和答案不能为空"));
        }

        Ok(Self {
            question,
            answer: answer.to_string(),
            tags: normalize_tags(tags.unwrap_or_default()),
        })
    }

    pub fn into_note(self, timestamp: String) -> Note {
        Note {
            question: self.question,
            answer: self.answer,
            tags: self.tags,
            timestamp,
        }
    }
}

/// Trim each tag, strip backticks (they delimit tags in the document) and
/// drop empty ones. Order and repeats are kept.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.replace('`', ""))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Validate one bulk-import entry. Errors carry the 1-based position.
pub(crate) fn prepare_candidate(
    position: usize,
    candidate: &ImportCandidate,
) -> Result<(NoteDraft, Option<String>), String> {
    let mut draft = NoteDraft::new(
        &candidate.question,
        &candidate.answer,
        candidate.tags.as_deref(),
    )
    .map_err(|_| format!("第 {} 条笔记缺少问题或答案", position))?;
    draft.tags = crate::notes::codec::dedupe_tags(draft.tags);

    let timestamp = candidate
        .timestamp
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok((draft, timestamp))
}

pub(crate) fn import_failure(position: usize, err: &NoteError) -> String {
    format!("第 {} 条笔记导入失败: {}", position, err)
}

/// Outcome of `import_batch`. Partial success is normal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported: Vec<Note>,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }
}

pub trait NoteStore: Send + Sync {
    /// Short name for logs and `/api/health`
    fn backend_name(&self) -> &'static str;

    /// Every note, newest-first by creation order
    fn list(&self) -> NoteResult<Vec<Note>>;

    fn get(&self, timestamp: &str) -> NoteResult<Note>;

    fn create(&self, question: &str, answer: &str, tags: Option<&[String]>) -> NoteResult<Note>;

    /// Overwrite question, answer and tags. The timestamp never changes.
    fn update(
        &self,
        timestamp: &str,
        question: &str,
        answer: &str,
        tags: Option<&[String]>,
    ) -> NoteResult<Note>;

    fn delete(&self, timestamp: &str) -> NoteResult<()>;

    fn import_batch(&self, candidates: &[ImportCandidate]) -> NoteResult<ImportReport>;

    fn related_to(&self, timestamp: &str) -> NoteResult<Vec<RelatedNote>>;

    /// The whole collection as a markdown document
    fn export_markdown(&self) -> NoteResult<String>;

    /// Case-insensitive substring match over question, answer and tags, with
    /// an optional exact tag filter. Newest-first.
    fn search(&self, query: Option<&str>, tag: Option<&str>) -> NoteResult<Vec<Note>> {
        let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
        let tag = tag.map(str::trim).filter(|t| !t.is_empty());

        Ok(self
            .list()?
            .into_iter()
            .filter(|note| {
                needle.is_empty()
                    || note.question.to_lowercase().contains(&needle)
                    || note.answer.to_lowercase().contains(&needle)
                    || note.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .filter(|note| tag.is_none_or(|t| note.tags.iter().any(|nt| nt == t)))
            .collect())
    }

    /// Tag usage, most used first, ties alphabetical
    fn tag_counts(&self) -> NoteResult<Vec<TagCount>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for note in self.list()? {
            for tag in note.tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then(a.tag.cmp(&b.tag)));
        Ok(tags)
    }
}
