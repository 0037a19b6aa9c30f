use clap::Parser;
use episode::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "episode=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path, name, admin }) => {
            episode::cli::init::run(path, name, admin).await?;
        }
        Some(Commands::Serve { host, port }) => {
            episode::cli::serve::run(&cli.config, host, port).await?;
        }
        Some(Commands::Migrate) => {
            episode::cli::migrate::run(&cli.config).await?;
        }
        Some(Commands::HashPassword) => {
            episode::cli::hash_password::run().await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
