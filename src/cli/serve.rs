use crate::{web, Config, Database};
use anyhow::Result;
use std::path::Path;

pub async fn run(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database)?;

    db.migrate()?;
    std::fs::create_dir_all(&config.storage.root)?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);
    tracing::info!(site = %config.site.title, "Starting server at http://{}", addr);

    web::serve(config, db, &addr).await?;

    Ok(())
}
