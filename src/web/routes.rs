use super::handlers;
use super::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

// Room for the text fields that travel with the image.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::public::index))
        .route("/view/:post_id", get(handlers::public::view_post))
        .route("/series/:series_id", get(handlers::public::view_series))
        .route("/health", get(handlers::public::health))
}

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/login",
            get(handlers::auth::login_form).post(handlers::auth::login),
        )
        .route("/logout", get(handlers::auth::logout))
}

pub fn admin_routes(max_upload: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/suite", get(handlers::admin::suite))
        .route(
            "/admin/create-post",
            get(handlers::admin::create_post_form)
                .post(handlers::admin::create_post)
                .layer(DefaultBodyLimit::max(max_upload.saturating_add(FORM_OVERHEAD))),
        )
        .route(
            "/admin/create-series",
            get(handlers::admin::create_series_form).post(handlers::admin::create_series),
        )
}
