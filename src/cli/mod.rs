pub mod hash_password;
pub mod init;
pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "episode")]
#[command(version)]
#[command(about = "A small CMS for posts published in series", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "episode.toml", env = "EPISODE_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a config file and data directories
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Administrator login name
        #[arg(long, default_value = "admin")]
        admin: String,
    },
    /// Run the web server
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations
    Migrate,
    /// Prompt for a password and print its hash for the config file
    HashPassword,
}
