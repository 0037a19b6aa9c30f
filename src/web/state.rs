use crate::services::auth::SessionStore;
use crate::services::markdown::MarkdownRenderer;
use crate::storage::BlobStore;
use crate::web::security::{CsrfManager, RateLimiter};
use crate::{Config, Database};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Tera, Value};

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub blobs: Arc<dyn BlobStore>,
    pub templates: Tera,
    pub markdown: MarkdownRenderer,
    pub sessions: SessionStore,
    pub csrf: CsrfManager,
    pub login_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, db: Database, blobs: Arc<dyn BlobStore>) -> Result<Self> {
        let mut templates = Tera::default();

        templates.register_filter("format_date", format_date_filter);
        templates.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("index.html", include_str!("../../templates/index.html")),
            ("view-post.html", include_str!("../../templates/view-post.html")),
            ("view-series.html", include_str!("../../templates/view-series.html")),
            ("login.html", include_str!("../../templates/login.html")),
            ("404.html", include_str!("../../templates/404.html")),
            ("admin/admin-suite.html", include_str!("../../templates/admin/admin-suite.html")),
            ("admin/create-post.html", include_str!("../../templates/admin/create-post.html")),
            ("admin/create-series.html", include_str!("../../templates/admin/create-series.html")),
        ])?;

        let sessions = SessionStore::new(config.session_lifetime());

        Ok(Self {
            config,
            db,
            blobs,
            templates,
            markdown: MarkdownRenderer::new(),
            sessions,
            csrf: CsrfManager,
            login_limiter: RateLimiter::default(),
        })
    }
}

fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let date_str = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("format_date requires a string"))?;

    let format = args
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("%B %d, %Y");

    match chrono::DateTime::parse_from_rfc3339(date_str) {
        Ok(dt) => Ok(Value::String(dt.format(format).to_string())),
        Err(_) => Ok(Value::String(date_str.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_filter() {
        let mut args = HashMap::new();
        let value = Value::String("2025-03-01T09:30:00.000000Z".into());
        assert_eq!(
            format_date_filter(&value, &args).unwrap(),
            Value::String("March 01, 2025".into())
        );

        args.insert("format".to_string(), Value::String("%Y-%m-%d".into()));
        assert_eq!(
            format_date_filter(&value, &args).unwrap(),
            Value::String("2025-03-01".into())
        );

        let raw = Value::String("yesterday".into());
        assert_eq!(format_date_filter(&raw, &args).unwrap(), raw);
        assert!(format_date_filter(&Value::Null, &args).is_err());
    }
}
