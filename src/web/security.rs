use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response};
use axum::middleware::Next;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub const CSRF_COOKIE: &str = "csrf";

pub fn security_headers<B>(mut response: Response<B>) -> Response<B> {
    let headers = response.headers_mut();

    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Post images may be hotlinked from any https origin.
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; script-src 'none'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; frame-ancestors 'none'; base-uri 'self'; form-action 'self'",
        ),
    );

    response
}

pub async fn apply_security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let response = next.run(request).await;
    security_headers(response)
}

/// Counts failed attempts per key and locks the key out once `max_attempts`
/// failures fall inside the lockout window.
pub struct RateLimiter {
    attempts: RwLock<HashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    lockout: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(900))
    }
}

impl RateLimiter {
    pub fn new(max_attempts: usize, lockout: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            lockout,
        }
    }

    /// Whether another attempt is allowed for `key`.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.write().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = attempts.get_mut(key) else {
            return true;
        };
        entry.retain(|t| now.duration_since(*t) < self.lockout);
        entry.len() < self.max_attempts
    }

    pub fn record_attempt(&self, key: &str) {
        let mut attempts = self.attempts.write().unwrap_or_else(|e| e.into_inner());
        attempts.entry(key.to_string()).or_default().push(Instant::now());
    }

    pub fn clear(&self, key: &str) {
        let mut attempts = self.attempts.write().unwrap_or_else(|e| e.into_inner());
        attempts.remove(key);
    }

    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut attempts = self.attempts.write().unwrap_or_else(|e| e.into_inner());
        attempts.retain(|_, v| {
            v.retain(|t| now.duration_since(*t) < self.lockout);
            !v.is_empty()
        });
    }
}

/// Double-submit CSRF tokens: the token lives in a cookie and must be echoed
/// back in the `csrf_token` form field.
#[derive(Default)]
pub struct CsrfManager;

impl CsrfManager {
    pub fn generate(&self) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    pub fn validate(&self, form_token: &str, cookie_token: &str) -> bool {
        !form_token.is_empty() && form_token == cookie_token
    }

    /// The token for a form page, reusing the visitor's cookie when present.
    pub fn issue(&self, jar: CookieJar) -> (CookieJar, String) {
        if let Some(existing) = jar.get(CSRF_COOKIE).map(|c| c.value().to_string()) {
            if !existing.is_empty() {
                return (jar, existing);
            }
        }
        let token = self.generate();
        let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .build();
        (jar.add(cookie), token)
    }

    pub fn verify(&self, jar: &CookieJar, form_token: &str) -> bool {
        jar.get(CSRF_COOKIE)
            .map(|c| self.validate(form_token, c.value()))
            .unwrap_or(false)
    }
}

/// A url-encoded form together with its CSRF token.
#[derive(Deserialize)]
pub struct CsrfForm<T> {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(flatten)]
    pub form: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_locks_after_max_attempts() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("login:editor"));
        limiter.record_attempt("login:editor");
        assert!(limiter.check("login:editor"));
        limiter.record_attempt("login:editor");
        assert!(!limiter.check("login:editor"));
        assert!(limiter.check("login:other"));

        limiter.clear("login:editor");
        assert!(limiter.check("login:editor"));
    }

    #[test]
    fn test_rate_limiter_forgets_old_attempts() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        limiter.record_attempt("k");
        assert!(limiter.check("k"));
        limiter.cleanup();
    }

    #[test]
    fn test_csrf_issue_and_verify() {
        let csrf = CsrfManager;
        let (jar, token) = csrf.issue(CookieJar::new());
        assert!(csrf.verify(&jar, &token));
        assert!(!csrf.verify(&jar, "forged"));
        assert!(!csrf.verify(&CookieJar::new(), &token));

        let (_, again) = csrf.issue(jar);
        assert_eq!(again, token);
    }

    #[test]
    fn test_csrf_form_flattens() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }
        let parsed: CsrfForm<Named> =
            serde_urlencoded_like("csrf_token=abc&name=editor").unwrap();
        assert_eq!(parsed.csrf_token, "abc");
        assert_eq!(parsed.form.name, "editor");
    }

    fn serde_urlencoded_like<T: serde::de::DeserializeOwned>(
        query: &str,
    ) -> Result<T, axum::extract::rejection::QueryRejection> {
        let uri: axum::http::Uri = format!("/?{}", query).parse().unwrap();
        axum::extract::Query::try_from_uri(&uri).map(|q| q.0)
    }
}
