//! Markdown codec for the notes document.
//!
//! One document holds every note as a section separated by `---` lines:
//!
//! ```text
//! # Claude 对话笔记
//!
//! ---
//!
//! ## 📝 What is TCP?
//!
//! **时间**: 2026/02/01 21:59:40
//!
//! **标签**: `networking` `protocols`
//!
//! ### 💡 回答
//!
//! A transport protocol.
//!
//! ---
//! ```
//!
//! Sections are written oldest-first. Decoding returns newest-first, matching
//! the store's `list()` order. An answer containing a bare `---` line is split
//! there; the format has no escaping.

use notes_types::Note;
use regex::Regex;
use std::sync::LazyLock;

pub const DOCUMENT_TITLE: &str = "# Claude 对话笔记";
pub const DELIMITER: &str = "---";
pub const QUESTION_PREFIX: &str = "## 📝";
pub const TIME_PREFIX: &str = "**时间**:";
pub const TAGS_PREFIX: &str = "**标签**:";
pub const ANSWER_HEADING: &str = "### 💡 回答";

static BACKTICK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static LENIENT_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{2,3}\s*(?:💡\s*)?回答").unwrap());
static LENIENT_QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,2}(?:\s*📝)?\s+(.+)$").unwrap());

/// How strictly section headings are matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Exactly what `encode` writes. Used for the store document.
    Strict,
    /// Hand-written or exported files: `#`/`##` questions with or without the
    /// 📝 marker, optional answer heading, trailing `#hashtag` lines as tags.
    Lenient,
}

/// One decoded section in document order. Fields may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Section {
    pub question: String,
    pub answer: String,
    pub tags: Vec<String>,
    pub timestamp: String,
}

impl Section {
    pub(crate) fn is_complete(&self) -> bool {
        !self.question.is_empty() && !self.answer.is_empty()
    }

    fn into_note(self) -> Note {
        Note {
            question: self.question,
            answer: self.answer,
            tags: self.tags,
            timestamp: self.timestamp,
        }
    }
}

/// Header written at the top of every document
pub fn document_header() -> String {
    format!("{}\n\n{}\n\n", DOCUMENT_TITLE, DELIMITER)
}

/// Render one note section, delimiter included
pub fn encode_note(note: &Note) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n\n", QUESTION_PREFIX, single_line(&note.question)));
    out.push_str(&format!("{} {}\n\n", TIME_PREFIX, note.timestamp));

    if !note.tags.is_empty() {
        let tags: Vec<String> = note.tags.iter().map(|t| format!("`{}`", t)).collect();
        out.push_str(&format!("{} {}\n\n", TAGS_PREFIX, tags.join(" ")));
    }

    out.push_str(&format!("{}\n\n{}\n\n", ANSWER_HEADING, note.answer));
    out.push_str(&format!("{}\n\n", DELIMITER));
    out
}

/// Encode notes in the order given (callers pass oldest-first)
pub fn encode(notes: &[Note]) -> String {
    let mut out = document_header();
    for note in notes {
        out.push_str(&encode_note(note));
    }
    out
}

/// Encode a newest-first list (as returned by `list()`) oldest-first
pub fn encode_newest_first(notes: &[Note]) -> String {
    let mut out = document_header();
    for note in notes.iter().rev() {
        out.push_str(&encode_note(note));
    }
    out
}

/// Decode a store document. Incomplete sections are dropped; the result is
/// newest-first.
pub fn decode(text: &str) -> Vec<Note> {
    let mut notes: Vec<Note> = parse_sections(text, Dialect::Strict)
        .into_iter()
        .filter(Section::is_complete)
        .map(Section::into_note)
        .collect();
    notes.reverse();
    notes
}

/// Parse every section in document order, complete or not
pub(crate) fn parse_sections(text: &str, dialect: Dialect) -> Vec<Section> {
    split_fragments(text)
        .into_iter()
        .map(|fragment| match dialect {
            Dialect::Strict => parse_strict(&fragment),
            Dialect::Lenient => parse_lenient(&fragment),
        })
        .collect()
}

/// Split on delimiter lines and drop blank fragments
fn split_fragments(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim() == DELIMITER {
            fragments.push(current.join("\n"));
            current.clear();
        } else {
            current.push(line);
        }
    }
    fragments.push(current.join("\n"));

    fragments
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .collect()
}

fn parse_strict(fragment: &str) -> Section {
    let lines: Vec<&str> = fragment.trim().lines().collect();
    let mut section = Section::default();

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        if let Some(rest) = line.strip_prefix(QUESTION_PREFIX) {
            section.question = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix(TIME_PREFIX) {
            section.timestamp = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix(TAGS_PREFIX) {
            section.tags = extract_backtick_tags(rest);
        } else if line.starts_with(ANSWER_HEADING) {
            section.answer = lines[i + 1..].join("\n").trim().to_string();
            break;
        }
    }

    section
}

fn parse_lenient(fragment: &str) -> Section {
    let lines: Vec<&str> = fragment.trim().lines().collect();
    let mut section = Section::default();
    let mut question_line: Option<usize> = None;
    let mut found_answer = false;

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        if LENIENT_ANSWER_RE.is_match(line) {
            section.answer = lines[i + 1..].join("\n").trim().to_string();
            found_answer = true;
            break;
        }

        if let Some(rest) = line.strip_prefix(TIME_PREFIX) {
            section.timestamp = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix(TAGS_PREFIX) {
            section.tags = extract_backtick_tags(rest);
        } else if question_line.is_none() {
            if let Some(caps) = LENIENT_QUESTION_RE.captures(line) {
                let question = caps[1].trim();
                if !question.is_empty() {
                    section.question = question.to_string();
                    question_line = Some(i);
                }
            }
        }
    }

    if !found_answer {
        if let Some(q) = question_line {
            let body = &lines[q + 1..];
            let (answer_end, hashtags) = split_trailing_hashtags(body);
            section.answer = body[..answer_end].join("\n").trim().to_string();
            section.tags.extend(hashtags);
        }
    }

    section.tags = dedupe_tags(section.tags);
    section
}

/// Find trailing `#tag #tag` lines. Returns where the answer ends and the
/// tags lifted out of those lines, in document order.
fn split_trailing_hashtags(lines: &[&str]) -> (usize, Vec<String>) {
    let mut end = lines.len();
    let mut lifted: Vec<Vec<String>> = Vec::new();

    for i in (0..lines.len()).rev() {
        let trimmed = lines[i].trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_hashtag_line(trimmed) {
            lifted.push(
                trimmed
                    .split_whitespace()
                    .map(|t| t.trim_start_matches('#').to_string())
                    .collect(),
            );
            end = i;
        } else {
            break;
        }
    }

    lifted.reverse();
    (end, lifted.into_iter().flatten().collect())
}

fn is_hashtag_line(line: &str) -> bool {
    line.split_whitespace()
        .all(|token| token.len() > 1 && token.starts_with('#') && !token[1..].contains('#'))
}

/// Every backtick-quoted token on a tags line, in order
pub(crate) fn extract_backtick_tags(text: &str) -> Vec<String> {
    BACKTICK_TAG_RE
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Drop repeats, keeping first occurrence order
pub(crate) fn dedupe_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Collapse a multi-line heading onto one line
pub(crate) fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
