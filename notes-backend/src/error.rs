use thiserror::Error;

/// Typed failures surfaced by every note store operation.
#[derive(Debug, Error)]
pub enum NoteError {
    /// Missing or empty required field
    #[error("{0}")]
    Validation(String),
    /// Unknown timestamp
    #[error("{0}")]
    NotFound(String),
    /// Duplicate timestamp
    #[error("{0}")]
    Conflict(String),
    /// I/O or database failure
    #[error("{0}")]
    Storage(String),
}

impl NoteError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound("笔记不存在".to_string())
    }

    pub fn conflict(timestamp: &str) -> Self {
        Self::Conflict(format!("时间戳已存在: {}", timestamp))
    }
}

impl From<std::io::Error> for NoteError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<rusqlite::Error> for NoteError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(err, _)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::Conflict(value.to_string())
            }
            _ => Self::Storage(value.to_string()),
        }
    }
}

impl From<r2d2::Error> for NoteError {
    fn from(value: r2d2::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for NoteError {
    fn from(value: serde_json::Error) -> Self {
        Self::Validation(format!("JSON 解析失败: {}", value))
    }
}

pub type NoteResult<T> = Result<T, NoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        assert!(matches!(NoteError::from(err), NoteError::Conflict(_)));
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(NoteError::from(err), NoteError::Storage(_)));
    }
}
