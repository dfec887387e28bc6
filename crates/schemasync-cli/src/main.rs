//! schemasync command-line interface.
//!
//! ```text
//! schemasync dev          sync, then watch and sync on every change
//! schemasync sync         sync once
//! schemasync plan --json  show what a sync would do
//! ```

mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, Command};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schemasync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let command = args.command.clone();
    let config = args.into_config();

    tracing::debug!(
        url = %config.client.base_url(),
        schema_roots = ?config.sync.schema_roots,
        dry_run = config.sync.dry_run,
        "configuration loaded"
    );

    let result = match command {
        Command::Dev => commands::dev(config).await,
        Command::Sync => commands::sync(config).await,
        Command::Plan { json } => commands::plan(config, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
