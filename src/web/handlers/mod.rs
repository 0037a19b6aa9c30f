pub mod admin;
pub mod auth;
pub mod public;

use crate::web::error::AppResult;
use crate::web::flash::Flash;
use crate::web::state::AppState;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tera::Context;

fn make_context(state: &AppState, admin: &Option<String>, flash: Option<Flash>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("site", &state.config.site);
    ctx.insert("admin", admin);
    ctx.insert("flash", &flash);
    ctx
}

fn not_found(state: &AppState, admin: &Option<String>) -> AppResult<Response> {
    let ctx = make_context(state, admin, None);
    let html = state.templates.render("404.html", &ctx)?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}
