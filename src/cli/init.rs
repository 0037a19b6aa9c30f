use crate::services::auth;
use anyhow::Result;
use std::path::PathBuf;

pub async fn run(path: PathBuf, name: Option<String>, admin: String) -> Result<()> {
    let config_path = path.join("episode.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    let site_name = name.unwrap_or_else(|| "My Series".to_string());
    let password = super::hash_password::prompt_new_password()?;
    let password_hash = auth::hash_password(&password)?;

    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(path.join("data"))?;
    std::fs::create_dir_all(path.join("data/blobs"))?;

    let config = format!(
        r#"[site]
title = "{}"
description = "Stories told one episode at a time"
url = "http://localhost:3000"

[server]
host = "127.0.0.1"
port = 3000

[database]
path = "./data/episode.db"
pool_size = 10

[storage]
root = "./data/blobs"
public_url = "/media"
max_upload_size = "10MB"

[admin]
username = "{}"
password_hash = "{}"

[auth]
session_lifetime = "7d"
"#,
        site_name.replace('"', "\\\""),
        admin.replace('"', "\\\""),
        password_hash
    );

    std::fs::write(&config_path, config)?;

    tracing::info!("Created new site at {:?}", path);
    tracing::info!("Run 'episode migrate' to set up the database");
    tracing::info!("Run 'episode serve' to start the server");

    Ok(())
}
