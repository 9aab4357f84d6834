mod commands;
mod console;
mod state;

use std::path::PathBuf;

use clap::Parser;
use marketplace::ApiError;
use session::{IdentityError, SessionError, StorageError};
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("sign-in failed: {0}")]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not allowed here; continue at {0}")]
    Redirect(&'static str),
    #[error("timed out waiting for the session to load")]
    Timeout,
    #[error("{0}")]
    Usage(String),
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        Self::Api(ApiError::Auth(e))
    }
}

#[derive(Parser, Debug)]
#[command(name = "flexrent", about = "FlexRent coworking marketplace CLI")]
struct Cli {
    /// Backend base URL; overrides FLEXRENT_API_BASE_URL from the environment.
    #[arg(long)]
    api_base_url: Option<String>,

    /// File holding the session cache, identity and payment flags.
    #[arg(long, env = "FLEXRENT_STATE_PATH")]
    state_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state_path = cli.state_path.unwrap_or_else(state::default_state_path);
    let app = state::App::build(cli.api_base_url.as_deref(), state_path)?;
    app.ready().await?;
    commands::run(&app, cli.command).await
}
