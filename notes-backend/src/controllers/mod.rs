pub mod auth;
pub mod health;
pub mod notes;

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};

use crate::error::NoteError;
use notes_types::ErrorResponse;

/// Bulk imports carry whole note collections
pub const JSON_LIMIT: usize = 8 * 1024 * 1024;

/// JSON extractor settings shared by the server and tests. Malformed bodies
/// get the usual `{success:false, error}` envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            let message = format!("请求格式错误: {}", err);
            InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(ErrorResponse::new(message)),
            )
            .into()
        })
}

/// Map a store failure onto its HTTP status
pub(crate) fn error_response(err: &NoteError) -> HttpResponse {
    let body = ErrorResponse::new(err.to_string());
    match err {
        NoteError::Validation(_) => HttpResponse::BadRequest().json(body),
        NoteError::NotFound(_) => HttpResponse::NotFound().json(body),
        NoteError::Conflict(_) | NoteError::Storage(_) => {
            log::error!("[NOTES] {}", err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}
