use super::{make_context, not_found};
use crate::services::{feed, posts, series};
use crate::web::error::AppResult;
use crate::web::extractors::OptionalAdmin;
use crate::web::flash;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

pub async fn index(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(admin): OptionalAdmin,
    jar: CookieJar,
) -> AppResult<Response> {
    let home = feed::home_feed(&state.db)?;

    let (jar, flash) = flash::take(jar);
    let mut ctx = make_context(&state, &admin, flash);
    ctx.insert("posts", &home.posts);
    ctx.insert("series", &home.series);
    ctx.insert("unavailable", &home.unavailable);

    let html = state.templates.render("index.html", &ctx)?;
    Ok((jar, Html(html)).into_response())
}

pub async fn view_post(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(admin): OptionalAdmin,
    Path(post_id): Path<String>,
    jar: CookieJar,
) -> AppResult<Response> {
    let Some(post) = posts::get_post_view(&state.db, &state.markdown, &post_id)? else {
        return not_found(&state, &admin);
    };

    let (jar, flash) = flash::take(jar);
    let mut ctx = make_context(&state, &admin, flash);
    ctx.insert("post", &post);
    ctx.insert("name", &state.config.admin.username);

    let html = state.templates.render("view-post.html", &ctx)?;
    Ok((jar, Html(html)).into_response())
}

pub async fn view_series(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(admin): OptionalAdmin,
    Path(series_id): Path<String>,
) -> AppResult<Response> {
    let Some(found) = series::get_series_with_posts(&state.db, &series_id)? else {
        return not_found(&state, &admin);
    };

    let mut ctx = make_context(&state, &admin, None);
    ctx.insert("series", &found.series);
    ctx.insert("posts", &found.posts);

    let html = state.templates.render("view-series.html", &ctx)?;
    Ok(Html(html).into_response())
}

pub async fn fallback(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(admin): OptionalAdmin,
) -> AppResult<Response> {
    not_found(&state, &admin)
}

pub async fn health() -> &'static str {
    "OK"
}
