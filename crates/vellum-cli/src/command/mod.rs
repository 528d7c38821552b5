//! Subcommands of the `vellum` binary.

mod health;
mod media;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use vellum_core::MediaId;
use vellum_postgres::{PgClient, PgClientMigrationExt};
use vellum_service::MediaStore;

use crate::TRACING_TARGET_COMMAND;

/// Operation to run against the media store.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Store a file and print its record.
    Put(PutArgs),
    /// Fetch a media item by id.
    Get(GetArgs),
    /// Delete one or more media items.
    Delete(DeleteArgs),
    /// List records with the given filename, newest first.
    Find(FindArgs),
    /// Probe the blob store once.
    Health,
    /// Probe the blob store periodically until interrupted.
    Monitor(MonitorArgs),
    /// Apply pending ledger migrations and exit.
    Migrate(MigrateArgs),
}

/// Arguments of `put`.
#[derive(Debug, Clone, Args)]
pub struct PutArgs {
    /// File to store.
    pub file: PathBuf,

    /// Name to record instead of the file name.
    #[arg(long)]
    pub name: Option<String>,

    /// Storage path prefixing the object key.
    #[arg(long)]
    pub base_path: Option<String>,

    /// User metadata entry, repeatable.
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,

    /// Object tag, repeatable.
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub tags: Vec<(String, String)>,
}

/// Arguments of `get`.
#[derive(Debug, Clone, Args)]
pub struct GetArgs {
    /// Media id.
    pub id: MediaId,

    /// Write the content to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Arguments of `delete`.
#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Media ids; several ids are deleted as one batch.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<MediaId>,
}

/// Arguments of `find`.
#[derive(Debug, Clone, Args)]
pub struct FindArgs {
    /// Filename to look up.
    pub name: String,
}

/// Arguments of `monitor`.
#[derive(Debug, Clone, Args)]
pub struct MonitorArgs {
    /// Seconds between probes; falls back to the configured interval.
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

/// Arguments of `migrate`.
#[derive(Debug, Clone, Args)]
pub struct MigrateArgs {
    /// List applied and pending migrations without applying anything.
    #[arg(long)]
    pub status: bool,
}

impl Command {
    /// Runs the command.
    pub async fn execute(self, store: &MediaStore, pg: &PgClient) -> anyhow::Result<()> {
        tracing::debug!(target: TRACING_TARGET_COMMAND, command = ?self, "Executing command");

        match self {
            Self::Put(args) => media::put(store, args).await,
            Self::Get(args) => media::get(store, args).await,
            Self::Delete(args) => media::delete(store, args).await,
            Self::Find(args) => media::find(pg, args).await,
            Self::Health => health::check(store).await,
            Self::Monitor(args) => health::monitor(store, args).await,
            Self::Migrate(args) => migrate(pg, args).await,
        }
    }
}

/// Applies pending ledger migrations, or prints their status.
pub async fn migrate(pg: &PgClient, args: MigrateArgs) -> anyhow::Result<()> {
    if args.status {
        return migration_status(pg).await;
    }

    let result = pg
        .run_pending_migrations()
        .await
        .context("failed to apply migrations")?;

    if result.is_no_op() {
        tracing::info!(target: TRACING_TARGET_COMMAND, "Ledger schema already up to date");
        return Ok(());
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        applied = result.processed_versions.len(),
        last_version = ?result.last_processed_version(),
        duration_ms = result.duration.as_millis(),
        "Ledger migrations applied"
    );

    Ok(())
}

async fn migration_status(pg: &PgClient) -> anyhow::Result<()> {
    let status = pg
        .get_migration_status()
        .await
        .context("failed to read migration status")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        last_applied = ?status.last_applied_version(),
        pending = status.pending_migrations(),
        up_to_date = status.is_up_to_date(),
        "Ledger migration status"
    );

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Parses a `KEY=VALUE` pair.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_pairs() {
        assert_eq!(
            parse_key_value("owner=ops"),
            Ok(("owner".to_owned(), "ops".to_owned()))
        );
        assert_eq!(
            parse_key_value("query=a=b"),
            Ok(("query".to_owned(), "a=b".to_owned()))
        );
        assert_eq!(parse_key_value("flag="), Ok(("flag".to_owned(), String::new())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
