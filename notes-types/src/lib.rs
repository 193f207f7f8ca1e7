//! Shared types for the notes backend and its HTTP clients.

use serde::{Deserialize, Serialize};

// =====================================================
// Domain Types
// =====================================================

/// A question/answer note. `timestamp` is the natural key and never changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub timestamp: String,
}

/// A note ranked against another note by shared tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedNote {
    #[serde(flatten)]
    pub note: Note,
    pub similarity: f64,
    pub common_tags: Vec<String>,
}

/// Tag usage across the whole collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

// =====================================================
// Request Types
// =====================================================

/// Body of `POST /api/notes` and `PUT /api/notes/{timestamp}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteInput {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// One entry of a bulk import. Missing fields deserialize as empty and are
/// rejected per item by the store, not by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCandidate {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Body of `POST /api/notes/import`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub notes: Vec<ImportCandidate>,
}

/// Body of `POST /api/notes/import/preview`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreviewRequest {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

// =====================================================
// Response Types
// =====================================================

/// `GET /api/env`: tells the UI whether it has to log in before editing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvInfo {
    pub is_production: bool,
    pub require_auth: bool,
}

/// Uniform failure envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_note_flattens_note_fields() {
        let related = RelatedNote {
            note: Note {
                question: "q".to_string(),
                answer: "a".to_string(),
                tags: vec!["x".to_string()],
                timestamp: "2026/02/01 21:59:40".to_string(),
            },
            similarity: 0.5,
            common_tags: vec!["x".to_string()],
        };

        let value = serde_json::to_value(&related).unwrap();
        assert_eq!(value["question"], "q");
        assert_eq!(value["timestamp"], "2026/02/01 21:59:40");
        assert_eq!(value["similarity"], 0.5);
        assert_eq!(value["commonTags"][0], "x");
    }

    #[test]
    fn test_import_candidate_tolerates_missing_fields() {
        let candidate: ImportCandidate = serde_json::from_str(r#"{"question":"only"}"#).unwrap();
        assert_eq!(candidate.question, "only");
        assert_eq!(candidate.answer, "");
        assert!(candidate.tags.is_none());
        assert!(candidate.timestamp.is_none());
    }
}
