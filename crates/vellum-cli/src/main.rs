#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;
mod shutdown;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use vellum_postgres::PgClient;
use vellum_service::MediaStore;

use crate::command::{Command, MigrateArgs};
use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "vellum_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "vellum_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "vellum_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "vellum_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = format!("{error:#}"),
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let pg = create_pg_client(&cli).context("failed to create database pool")?;

    if let Command::Migrate(args) = cli.command {
        return command::migrate(&pg, args).await;
    }
    if cli.migrate {
        command::migrate(&pg, MigrateArgs { status: false }).await?;
    }

    let store = MediaStore::connect(&cli.media, Arc::new(pg.clone()))
        .await
        .context("failed to connect media store")?;

    cli.command.execute(&store, &pg).await
}

/// Creates the ledger connection pool.
fn create_pg_client(cli: &Cli) -> anyhow::Result<PgClient> {
    let pg = cli.postgres.clone().build()?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        max_connections = cli.postgres.postgres_max_connections,
        "Database pool created"
    );

    Ok(pg)
}
