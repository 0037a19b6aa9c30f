use crate::config::AdminConfig;
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::sync::RwLock;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        anyhow::bail!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        );
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    validate_password(password)?;
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dW5rbm93bg$0000000000000000000000000000000000000000000";

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => {
            if let Ok(dummy) = PasswordHash::new(DUMMY_HASH) {
                let _ = Argon2::default().verify_password(password.as_bytes(), &dummy);
            }
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Check a login against the configured administrator. The password is
/// verified even when the username is wrong.
pub fn authenticate(admin: &AdminConfig, username: &str, password: &str) -> bool {
    let password_ok = verify_password(password, &admin.password_hash);
    password_ok && username == admin.username
}

pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: DateTime<Utc>,
}

/// In-process login sessions: token → username until expiry.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn create(&self, username: &str) -> String {
        let token = generate_session_token();
        let session = Session {
            username: username.to_string(),
            expires_at: Utc::now() + self.lifetime,
        };
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(token.clone(), session);
        token
    }

    /// Username of an unexpired session.
    pub fn validate(&self, token: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now() && !s.username.is_empty())
            .map(|s| s.username.clone())
    }

    pub fn remove(&self, token: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(token);
    }

    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminConfig {
        AdminConfig {
            username: "editor".into(),
            password_hash: hash_password("correct-horse").unwrap(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse", &hash));
        assert!(!verify_password("wrong-horse", &hash));
        assert!(!verify_password("correct-horse", "not-a-hash"));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(hash_password("short").is_err());
    }

    #[test]
    fn test_authenticate() {
        let admin = admin();
        assert!(authenticate(&admin, "editor", "correct-horse"));
        assert!(!authenticate(&admin, "editor", "nope-nope"));
        assert!(!authenticate(&admin, "someone", "correct-horse"));
    }

    #[test]
    fn test_session_lifecycle() {
        let store = SessionStore::new(Duration::days(7));
        let token = store.create("editor");
        assert_eq!(store.validate(&token).as_deref(), Some("editor"));
        assert!(store.validate("forged").is_none());

        store.remove(&token);
        assert!(store.validate(&token).is_none());
    }

    #[test]
    fn test_expired_sessions_are_invalid_and_cleaned() {
        let store = SessionStore::new(Duration::seconds(-1));
        let token = store.create("editor");
        assert!(store.validate(&token).is_none());
        assert_eq!(store.cleanup(), 1);
    }
}
