//! Notes REST API.
//!
//! Reads are public. Mutations (create, update, delete, import) require an
//! admin token when the server runs in production.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::auth::require_admin;
use super::error_response;
use crate::notes::import;
use crate::AppState;
use notes_types::{
    ErrorResponse, ImportCandidate, ImportPreviewRequest, ImportRequest, Note, NoteInput,
    RelatedNote, TagCount,
};

/// Path segments arrive percent-encoded (`2026%2F02%2F01%2021%3A59%3A40`)
fn decode_timestamp(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

// --- Response bodies ---

#[derive(Serialize)]
struct NotesResponse {
    success: bool,
    notes: Vec<Note>,
}

#[derive(Serialize)]
struct NoteResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    note: Note,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    success: bool,
    message: String,
    deleted_timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    success: bool,
    message: String,
    imported: Vec<Note>,
    imported_count: usize,
    errors: Option<Vec<String>>,
}

#[derive(Serialize)]
struct PreviewResponse {
    success: bool,
    notes: Vec<ImportCandidate>,
}

#[derive(Serialize)]
struct RelatedResponse {
    success: bool,
    related: Vec<RelatedNote>,
}

#[derive(Serialize)]
struct TagsResponse {
    success: bool,
    tags: Vec<TagCount>,
}

#[derive(Serialize)]
struct RawResponse {
    success: bool,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
    tag: Option<String>,
}

// --- Reads ---

async fn list_notes(state: web::Data<AppState>, query: web::Query<ListQuery>) -> impl Responder {
    let result = if query.q.is_none() && query.tag.is_none() {
        state.store.list()
    } else {
        state.store.search(query.q.as_deref(), query.tag.as_deref())
    };

    match result {
        Ok(notes) => HttpResponse::Ok().json(NotesResponse {
            success: true,
            notes,
        }),
        Err(e) => error_response(&e),
    }
}

async fn get_note(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.store.get(&decode_timestamp(&path)) {
        Ok(note) => HttpResponse::Ok().json(NoteResponse {
            success: true,
            message: None,
            note,
        }),
        Err(e) => error_response(&e),
    }
}

async fn list_tags(state: web::Data<AppState>) -> impl Responder {
    match state.store.tag_counts() {
        Ok(tags) => HttpResponse::Ok().json(TagsResponse {
            success: true,
            tags,
        }),
        Err(e) => error_response(&e),
    }
}

async fn raw_markdown(state: web::Data<AppState>) -> impl Responder {
    match state.store.export_markdown() {
        Ok(content) => HttpResponse::Ok().json(RawResponse {
            success: true,
            content,
        }),
        Err(e) => error_response(&e),
    }
}

async fn related_notes(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.store.related_to(&decode_timestamp(&path)) {
        Ok(related) => HttpResponse::Ok().json(RelatedResponse {
            success: true,
            related,
        }),
        Err(e) => error_response(&e),
    }
}

// --- Mutations ---

async fn create_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NoteInput>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state, &req) {
        return resp;
    }

    match state
        .store
        .create(&body.question, &body.answer, body.tags.as_deref())
    {
        Ok(note) => HttpResponse::Ok().json(NoteResponse {
            success: true,
            message: Some("笔记已保存".to_string()),
            note,
        }),
        Err(e) => error_response(&e),
    }
}

async fn update_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<NoteInput>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state, &req) {
        return resp;
    }

    let timestamp = decode_timestamp(&path);
    match state
        .store
        .update(&timestamp, &body.question, &body.answer, body.tags.as_deref())
    {
        Ok(note) => HttpResponse::Ok().json(NoteResponse {
            success: true,
            message: Some("笔记已更新".to_string()),
            note,
        }),
        Err(e) => error_response(&e),
    }
}

async fn delete_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state, &req) {
        return resp;
    }

    let timestamp = decode_timestamp(&path);
    match state.store.delete(&timestamp) {
        Ok(()) => HttpResponse::Ok().json(DeleteResponse {
            success: true,
            message: "笔记已删除".to_string(),
            deleted_timestamp: timestamp,
        }),
        Err(e) => error_response(&e),
    }
}

async fn import_notes(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state, &req) {
        return resp;
    }

    let request = match serde_json::from_value::<ImportRequest>(body.into_inner()) {
        Ok(r) if !r.notes.is_empty() => r,
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse::new("笔记数据格式错误或为空"));
        }
    };

    match state.store.import_batch(&request.notes) {
        Ok(report) => {
            let imported_count = report.imported_count();
            HttpResponse::Ok().json(ImportResponse {
                success: true,
                message: format!("成功导入 {} 条笔记", imported_count),
                imported: report.imported,
                imported_count,
                errors: (!report.errors.is_empty()).then_some(report.errors),
            })
        }
        Err(e) => error_response(&e),
    }
}

/// Parse an uploaded file into candidates without storing anything
async fn preview_import(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ImportPreviewRequest>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state, &req) {
        return resp;
    }

    match import::parse_upload(&body.file_name, &body.content) {
        Ok(notes) => HttpResponse::Ok().json(PreviewResponse {
            success: true,
            notes,
        }),
        Err(e) => error_response(&e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/notes")
            .route("", web::get().to(list_notes))
            .route("", web::post().to(create_note))
            .route("/tags", web::get().to(list_tags))
            .route("/raw", web::get().to(raw_markdown))
            .route("/import", web::post().to(import_notes))
            .route("/import/preview", web::post().to(preview_import))
            .route("/{timestamp}/related", web::get().to(related_notes))
            .route("/{timestamp}", web::get().to(get_note))
            .route("/{timestamp}", web::put().to(update_note))
            .route("/{timestamp}", web::delete().to(delete_note)),
    );
}
