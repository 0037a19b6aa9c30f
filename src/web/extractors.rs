use crate::web::flash::{self, Flash};
use crate::web::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "session";

/// The logged-in administrator. Requests without a live session are sent to
/// the login page with a warning.
pub struct AdminSession(pub String);

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = Response;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let headers = parts.headers.clone();
        Box::pin(async move {
            let cookies = CookieJar::from_headers(&headers);
            let username = cookies
                .get(SESSION_COOKIE)
                .and_then(|c| state.sessions.validate(c.value()));

            match username {
                Some(name) => Ok(AdminSession(name)),
                None => {
                    let jar = flash::set(
                        CookieJar::new(),
                        Flash::new("warning", "You need to log in in order to access that page."),
                    );
                    Err((jar, Redirect::to("/login")).into_response())
                }
            }
        })
    }
}

/// The logged-in administrator, if any. Never rejects.
pub struct OptionalAdmin(pub Option<String>);

impl FromRequestParts<Arc<AppState>> for OptionalAdmin {
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let headers = parts.headers.clone();
        Box::pin(async move {
            let cookies = CookieJar::from_headers(&headers);
            let username = cookies
                .get(SESSION_COOKIE)
                .and_then(|c| state.sessions.validate(c.value()));
            Ok(OptionalAdmin(username))
        })
    }
}
