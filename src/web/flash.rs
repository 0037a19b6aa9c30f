//! One-shot messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

impl Flash {
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

pub fn set(jar: CookieJar, flash: Flash) -> CookieJar {
    let encoded = match serde_json::to_vec(&flash) {
        Ok(bytes) => URL_SAFE_NO_PAD.encode(bytes),
        Err(_) => return jar,
    };
    let cookie = Cookie::build((FLASH_COOKIE, encoded))
        .path("/")
        .http_only(true)
        .build();
    jar.add(cookie)
}

/// Read and clear the pending flash message, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = URL_SAFE_NO_PAD
        .decode(cookie.value())
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok());

    let removal = Cookie::build((FLASH_COOKIE, "")).path("/").build();
    (jar.remove(removal), flash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_take() {
        let jar = set(CookieJar::new(), Flash::new("success", "Post created successfully!"));
        let (jar, flash) = take(jar);
        assert_eq!(flash, Some(Flash::new("success", "Post created successfully!")));
        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn test_garbage_cookie_is_ignored() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "%%%"));
        let (_, flash) = take(jar);
        assert!(flash.is_none());
    }
}
