use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ADMIN_USERNAME_ENV: &str = "ADMIN_USERNAME";
pub const ADMIN_PASSWORD_HASH_ENV: &str = "ADMIN_PASSWORD_HASH";

const MAX_SESSION_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Where uploaded objects are written and the URL prefix they are served under.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub root: String,
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_max_upload")]
    pub max_upload_size: String,
}

/// The single administrator account. The password is stored as an Argon2
/// PHC string produced by `episode hash-password`.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    pub username: String,
    pub password_hash: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime: default_session_lifetime(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pool_size() -> u32 {
    10
}

fn default_public_url() -> String {
    "/media".to_string()
}

fn default_max_upload() -> String {
    "10MB".to_string()
}

fn default_session_lifetime() -> String {
    "7d".to_string()
}

/// Parse sizes like `512KB`, `10MB`, `1GB` or a bare byte count.
pub fn parse_size(value: &str) -> Result<usize> {
    let value = value.trim().to_ascii_uppercase();
    let (number, multiplier) = if let Some(n) = value.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = value.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = value.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = value.strip_suffix('B') {
        (n, 1)
    } else {
        (value.as_str(), 1)
    };
    let number: usize = number
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size '{}'", value))?;
    number
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Size '{}' is too large", value))
}

/// Parse lifetimes like `7d`, `12h` or `30m`.
pub fn parse_duration(value: &str) -> Result<chrono::Duration> {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        anyhow::bail!("Duration cannot be empty");
    };
    let number: i64 = value[..value.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid duration '{}'", value))?;
    let duration = match unit {
        'd' => chrono::Duration::try_days(number),
        'h' => chrono::Duration::try_hours(number),
        'm' => chrono::Duration::try_minutes(number),
        _ => anyhow::bail!("Invalid duration unit in '{}' (use d, h or m)", value),
    };
    duration.ok_or_else(|| anyhow::anyhow!("Duration '{}' is out of range", value))
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run 'episode init' to create one.",
                path.display(),
                e
            )
        })?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Admin credentials can be supplied through the environment instead of
    /// the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(username) = std::env::var(ADMIN_USERNAME_ENV) {
            if !username.is_empty() {
                self.admin.username = username;
            }
        }
        if let Ok(hash) = std::env::var(ADMIN_PASSWORD_HASH_ENV) {
            if !hash.is_empty() {
                self.admin.password_hash = hash;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.admin.username.trim().is_empty() {
            anyhow::bail!("admin.username must be set");
        }
        if self.admin.password_hash.trim().is_empty() {
            anyhow::bail!("admin.password_hash must be set (see 'episode hash-password')");
        }
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        let public_url = self.storage.public_url.trim_end_matches('/');
        if public_url.is_empty() {
            anyhow::bail!("storage.public_url must be a path like /media or an absolute URL");
        }
        if parse_size(&self.storage.max_upload_size)? == 0 {
            anyhow::bail!("storage.max_upload_size must be greater than 0");
        }
        let lifetime = parse_duration(&self.auth.session_lifetime)?;
        if lifetime <= chrono::Duration::zero() {
            anyhow::bail!("auth.session_lifetime must be positive");
        }
        if lifetime > chrono::Duration::days(MAX_SESSION_DAYS) {
            anyhow::bail!("auth.session_lifetime must be at most {}d", MAX_SESSION_DAYS);
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        parse_size(&self.storage.max_upload_size).unwrap_or(10 * 1024 * 1024)
    }

    pub fn session_lifetime(&self) -> chrono::Duration {
        parse_duration(&self.auth.session_lifetime).unwrap_or_else(|_| chrono::Duration::days(7))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[site]
title = "Field Notes"
url = "http://localhost:3000"

[database]
path = "./data/episode.db"

[storage]
root = "./data/blobs"

[admin]
username = "editor"
password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
"#;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.storage.public_url, "/media");
        assert_eq!(config.max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.session_lifetime(), chrono::Duration::days(7));
    }

    #[test]
    fn test_missing_admin_is_rejected() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.admin.password_hash.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_limits_are_rejected() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.storage.max_upload_size = format!("{}GB", usize::MAX / 2);
        assert!(config.validate().is_err());

        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.auth.session_lifetime = format!("{}d", i64::MAX / 2);
        assert!(config.validate().is_err());

        config.auth.session_lifetime = "100000000d".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_root_public_url_is_rejected() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.storage.public_url = "/".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("512kb").unwrap(), 512 * 1024);
        assert_eq!(parse_size("2048").unwrap(), 2048);
        assert!(parse_size("lots").is_err());
        assert!(parse_size(&format!("{}GB", usize::MAX)).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7d").unwrap(), chrono::Duration::days(7));
        assert_eq!(parse_duration("12h").unwrap(), chrono::Duration::hours(12));
        assert_eq!(parse_duration("30m").unwrap(), chrono::Duration::minutes(30));
        assert!(parse_duration("7w").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration(&format!("{}d", i64::MAX)).is_err());
    }
}
