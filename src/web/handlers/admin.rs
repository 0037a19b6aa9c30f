use super::make_context;
use crate::models::SeriesChoice;
use crate::services::forms::{FormErrors, PostForm, SeriesForm, UploadedFile};
use crate::services::{feed, posts, series};
use crate::web::error::AppResult;
use crate::web::extractors::AdminSession;
use crate::web::flash::{self, Flash};
use crate::web::security::CsrfForm;
use crate::web::state::AppState;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

pub async fn suite(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    jar: CookieJar,
) -> AppResult<Response> {
    let all_posts = posts::list_all_posts(&state.db)?;
    let all_series = feed::list_series(&state.db)?;

    let (jar, flash) = flash::take(jar);
    let mut ctx = make_context(&state, &Some(admin), flash);
    ctx.insert("posts", &all_posts);
    ctx.insert("series", &all_series);

    let html = state.templates.render("admin/admin-suite.html", &ctx)?;
    Ok((jar, Html(html)).into_response())
}

struct PostPage<'a> {
    admin: String,
    form: &'a PostForm,
    errors: &'a FormErrors,
    choices: &'a [SeriesChoice],
    status: StatusCode,
    flash: Option<Flash>,
}

fn render_post_form(state: &AppState, jar: CookieJar, page: PostPage<'_>) -> AppResult<Response> {
    let (jar, csrf_token) = state.csrf.issue(jar);
    let mut ctx = make_context(state, &Some(page.admin), page.flash);
    ctx.insert("form", page.form);
    ctx.insert("errors", page.errors);
    ctx.insert("choices", page.choices);
    ctx.insert("csrf_token", &csrf_token);
    let html = state.templates.render("admin/create-post.html", &ctx)?;
    Ok((page.status, jar, Html(html)).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Preselect {
    pub series_id: String,
}

pub async fn create_post_form(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    Query(preselect): Query<Preselect>,
    jar: CookieJar,
) -> AppResult<Response> {
    let choices = series::series_choices(&state.db)?;
    let form = PostForm {
        series_id: preselect.series_id,
        ..PostForm::default()
    };

    let (jar, flash) = flash::take(jar);
    render_post_form(
        &state,
        jar,
        PostPage {
            admin,
            form: &form,
            errors: &FormErrors::new(),
            choices: &choices,
            status: StatusCode::OK,
            flash,
        },
    )
}

/// Collect the post form fields and the CSRF token from a multipart body.
async fn read_post_form(multipart: &mut Multipart) -> AppResult<(String, PostForm)> {
    let mut csrf_token = String::new();
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pic" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                form.pic = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "csrf_token" => csrf_token = field.text().await?,
            "title" => form.title = field.text().await?,
            "description" => form.description = field.text().await?,
            "content" => form.content = field.text().await?,
            "image_url" => form.image_url = field.text().await?,
            "series_id" => form.series_id = field.text().await?,
            _ => {}
        }
    }

    Ok((csrf_token, form))
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    jar: CookieJar,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let (csrf_token, form) = read_post_form(&mut multipart).await?;
    if !state.csrf.verify(&jar, &csrf_token) {
        return Ok((StatusCode::FORBIDDEN, "Invalid CSRF token").into_response());
    }

    let choices = series::series_choices(&state.db)?;
    let submission = match form.validate(&choices) {
        Ok(submission) => submission,
        Err(errors) => {
            return render_post_form(
                &state,
                jar,
                PostPage {
                    admin,
                    form: &form,
                    errors: &errors,
                    choices: &choices,
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    flash: None,
                },
            );
        }
    };

    match posts::create_post(&state.db, state.blobs.as_ref(), submission) {
        Ok(post_id) => {
            let jar = flash::set(jar, Flash::new("success", "Post created successfully!"));
            Ok((jar, Redirect::to(&format!("/view/{}", post_id))).into_response())
        }
        Err(e) => {
            tracing::error!("Error saving post: {:?}", e);
            render_post_form(
                &state,
                jar,
                PostPage {
                    admin,
                    form: &form,
                    errors: &FormErrors::new(),
                    choices: &choices,
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    flash: Some(Flash::new("danger", "Error saving post. Please try again.")),
                },
            )
        }
    }
}

fn render_series_form(
    state: &AppState,
    jar: CookieJar,
    admin: String,
    form: &SeriesForm,
    errors: &FormErrors,
    status: StatusCode,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let (jar, csrf_token) = state.csrf.issue(jar);
    let mut ctx = make_context(state, &Some(admin), flash);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("csrf_token", &csrf_token);
    let html = state.templates.render("admin/create-series.html", &ctx)?;
    Ok((status, jar, Html(html)).into_response())
}

pub async fn create_series_form(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    jar: CookieJar,
) -> AppResult<Response> {
    let (jar, flash) = flash::take(jar);
    render_series_form(
        &state,
        jar,
        admin,
        &SeriesForm::default(),
        &FormErrors::new(),
        StatusCode::OK,
        flash,
    )
}

pub async fn create_series(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    jar: CookieJar,
    Form(submitted): Form<CsrfForm<SeriesForm>>,
) -> AppResult<Response> {
    if !state.csrf.verify(&jar, &submitted.csrf_token) {
        return Ok((StatusCode::FORBIDDEN, "Invalid CSRF token").into_response());
    }
    let form = submitted.form;

    let existing = feed::list_series(&state.db)?;
    let submission = match form.validate(&existing) {
        Ok(submission) => submission,
        Err(errors) => {
            return render_series_form(
                &state,
                jar,
                admin,
                &form,
                &errors,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
            );
        }
    };

    match series::create_series(&state.db, &submission) {
        Ok(series_id) => {
            let jar = flash::set(
                jar,
                Flash::new(
                    "success",
                    format!("Series '{}' created successfully!", submission.title),
                ),
            );
            let target = format!("/admin/create-post?series_id={}", series_id);
            Ok((jar, Redirect::to(&target)).into_response())
        }
        Err(e) => {
            tracing::error!("Error saving series: {:?}", e);
            render_series_form(
                &state,
                jar,
                admin,
                &form,
                &FormErrors::new(),
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(Flash::new("danger", "Error saving series. Please try again.")),
            )
        }
    }
}
