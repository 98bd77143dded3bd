//! Umbra CLI application: a thin front end exercising the SDK (scan,
//! balance, swap, resume) against a JSON-fixture indexer and an in-memory
//! demo settlement client — a demonstration and integration-test harness,
//! not a product surface.

mod cli;
mod commands;
mod config;
mod demo;
mod fixtures;

use clap::Parser as _;
use cli::{Cli, Commands, ConfigCommands, KeyCommands, PendingCommands};

fn init_tracing() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init()
        .map_err(|err| eyre::eyre!("failed to initialize tracing: {err:?}"))?;
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> eyre::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Schema => config::print_schema(),
        },
        Commands::Key { command } => match command {
            KeyCommands::Derive { seed } => commands::key_derive(&seed),
        },
        Commands::Scan(args) => commands::scan(&args).await,
        Commands::Balance(args) => commands::balance(&args).await,
        Commands::Transfer(args) => commands::transfer(&args).await,
        Commands::Swap(args) => commands::swap(&args).await,
        Commands::AddLiquidity(args) => commands::add_liquidity(&args).await,
        Commands::RemoveLiquidity(args) => commands::remove_liquidity(&args).await,
        Commands::Pending { command } => match command {
            PendingCommands::Resume { operation_id, pending_dir } => commands::pending_resume(&operation_id, &pending_dir).await,
        },
    };

    if let Err(err) = result {
        tracing::error!("error: {err:?}");
        std::process::exit(1);
    }

    Ok(())
}
