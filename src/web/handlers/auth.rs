use super::make_context;
use crate::services::auth;
use crate::services::forms::{FormErrors, LoginForm};
use crate::web::error::AppResult;
use crate::web::extractors::{OptionalAdmin, SESSION_COOKIE};
use crate::web::flash::{self, Flash};
use crate::web::security::CsrfForm;
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use time::Duration;

fn render_login(
    state: &AppState,
    jar: CookieJar,
    status: StatusCode,
    name: &str,
    errors: &FormErrors,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let (jar, csrf_token) = state.csrf.issue(jar);
    let mut ctx = make_context(state, &None, flash);
    ctx.insert("name", name);
    ctx.insert("errors", errors);
    ctx.insert("csrf_token", &csrf_token);
    let html = state.templates.render("login.html", &ctx)?;
    Ok((status, jar, Html(html)).into_response())
}

pub async fn login_form(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(admin): OptionalAdmin,
    jar: CookieJar,
) -> AppResult<Response> {
    if admin.is_some() {
        return Ok(Redirect::to("/admin/suite").into_response());
    }
    let (jar, flash) = flash::take(jar);
    render_login(&state, jar, StatusCode::OK, "", &FormErrors::new(), flash)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(submitted): Form<CsrfForm<LoginForm>>,
) -> AppResult<Response> {
    if !state.csrf.verify(&jar, &submitted.csrf_token) {
        return Ok((StatusCode::FORBIDDEN, "Invalid CSRF token").into_response());
    }
    let form = submitted.form;

    if let Err(errors) = form.validate() {
        return render_login(
            &state,
            jar,
            StatusCode::UNPROCESSABLE_ENTITY,
            &form.name,
            &errors,
            None,
        );
    }

    let rate_key = format!("login:{}", form.name.trim());
    if !state.login_limiter.check(&rate_key) {
        tracing::warn!(username = %form.name.trim(), "Login locked out after repeated failures");
        return render_login(
            &state,
            jar,
            StatusCode::TOO_MANY_REQUESTS,
            &form.name,
            &FormErrors::new(),
            Some(Flash::new(
                "danger",
                "Too many login attempts. Please try again later.",
            )),
        );
    }

    if !auth::authenticate(&state.config.admin, form.name.trim(), &form.password) {
        state.login_limiter.record_attempt(&rate_key);
        tracing::info!(username = %form.name.trim(), "Failed login");
        return render_login(
            &state,
            jar,
            StatusCode::UNAUTHORIZED,
            &form.name,
            &FormErrors::new(),
            Some(Flash::new("danger", "Invalid credentials. Try again.")),
        );
    }

    state.login_limiter.clear(&rate_key);
    let token = state.sessions.create(form.name.trim());
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(state.sessions.lifetime().num_seconds()))
        .build();

    let jar = flash::set(jar.add(cookie), Flash::new("success", "You are logged in!"));
    Ok((jar, Redirect::to("/admin/suite")).into_response())
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> AppResult<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }

    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    let jar = flash::set(jar.remove(cookie), Flash::new("info", "You are logged out"));
    Ok((jar, Redirect::to("/login")).into_response())
}
