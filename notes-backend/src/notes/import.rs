//! Import parsers: turn an uploaded markdown or JSON file into candidates
//! for `NoteStore::import_batch`.

use serde_json::Value;

use super::codec::{self, Dialect, Section};
use crate::error::{NoteError, NoteResult};
use notes_types::ImportCandidate;

/// Complete sections of a hand-written or exported markdown file, in
/// document order
pub fn parse_markdown(text: &str) -> Vec<ImportCandidate> {
    codec::parse_sections(text, Dialect::Lenient)
        .into_iter()
        .filter(Section::is_complete)
        .map(|section| ImportCandidate {
            question: section.question,
            answer: section.answer,
            tags: Some(section.tags),
            timestamp: Some(section.timestamp).filter(|t| !t.is_empty()),
        })
        .collect()
}

/// A JSON array of notes. Missing fields come through empty.
pub fn parse_json(text: &str) -> NoteResult<Vec<ImportCandidate>> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_array() {
        return Err(NoteError::validation("JSON 文件必须是笔记数组"));
    }
    Ok(serde_json::from_value(value)?)
}

/// Dispatch on the file extension. Zero parsed notes is an error.
pub fn parse_upload(file_name: &str, content: &str) -> NoteResult<Vec<ImportCandidate>> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let notes = match extension.as_str() {
        "json" => parse_json(content)?,
        "md" | "markdown" => parse_markdown(content),
        _ => {
            return Err(NoteError::validation(
                "不支持的文件格式，请上传 .md 或 .json 文件",
            ))
        }
    };

    if notes.is_empty() {
        return Err(NoteError::validation("未能从文件中解析出笔记"));
    }

    log::debug!("[NOTES] Parsed {} import candidates from {}", notes.len(), file_name);
    Ok(notes)
}
