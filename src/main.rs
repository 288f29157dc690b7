use anyhow::Result;
use clap::{Parser, Subcommand};
use ledgerfeed_backend::api;
use ledgerfeed_backend::bootstrap;
use ledgerfeed_backend::config::LedgerfeedConfig;
use ledgerfeed_backend::telemetry;
use ledgerfeed_backend::utils;

#[derive(Parser)]
#[command(author, version, about = "Ledgerfeed backend daemon")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::print_banner();
    telemetry::init_tracing();

    let args = Args::parse();

    let config = LedgerfeedConfig::from_env()?;
    let resources = bootstrap::initialize(&config)?;
    tracing::info!(
        db_path = %config.paths.db_path.display(),
        database_initialized = resources.database_initialized,
        "bootstrap complete"
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, resources.database).await,
    }
}
