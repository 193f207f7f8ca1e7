//! Admin login and environment discovery for the web UI.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Serialize;

use crate::auth::bearer_token;
use crate::AppState;
use notes_types::{EnvInfo, ErrorResponse, LoginRequest};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/login").route(web::post().to(login)))
        .service(web::resource("/api/env").route(web::get().to(env_info)));
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    token: String,
    message: String,
}

/// Mutations need a valid bearer token in production; anything goes otherwise
pub(crate) fn require_admin(
    state: &web::Data<AppState>,
    req: &HttpRequest,
) -> Result<(), HttpResponse> {
    if !state.config.require_auth() {
        return Ok(());
    }

    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    match bearer_token(header) {
        Some(token) if state.tokens.is_valid(token) => Ok(()),
        _ => Err(HttpResponse::Unauthorized().json(ErrorResponse::new("需要管理员权限"))),
    }
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> impl Responder {
    match state
        .tokens
        .login(state.config.admin_password.as_deref(), &body.password)
    {
        Some(token) => HttpResponse::Ok().json(LoginResponse {
            success: true,
            token,
            message: "登录成功".to_string(),
        }),
        None => HttpResponse::Unauthorized().json(ErrorResponse::new("密码错误")),
    }
}

async fn env_info(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(EnvInfo {
        is_production: state.config.is_production,
        require_auth: state.config.require_auth(),
    })
}
