//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── media: MediaStoreConfig   # Blob store provider, bucket, deadlines
//! ├── postgres: PgConfig        # Ledger connection pool
//! ├── migrate: bool             # Apply pending migrations first
//! └── command: Command          # put, get, delete, find, health, monitor, migrate
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

use std::process;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vellum_postgres::PgConfig;
use vellum_service::MediaStoreConfig;

use crate::command::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "vellum")]
#[command(about = "Store media in a Postgres ledger and an object store")]
#[command(version)]
pub struct Cli {
    /// Blob store configuration.
    #[clap(flatten)]
    pub media: MediaStoreConfig,

    /// Ledger database configuration.
    #[clap(flatten)]
    pub postgres: PgConfig,

    /// Apply pending ledger migrations before running the command.
    #[arg(long, env = "VELLUM_MIGRATE", global = true)]
    pub migrate: bool,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.media
            .validate()
            .context("invalid media store configuration")?;
        self.postgres
            .validate()
            .context("invalid database configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            provider = %self.media.provider,
            bucket = %self.media.bucket,
            endpoint = ?self.media.endpoint,
            region = self.media.region(),
            timeout_secs = self.media.timeout_secs,
            health_check_interval_secs = ?self.media.health_check_interval_secs,
            "Media store configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            postgres_url = %self.postgres.database_url_masked(),
            postgres_max_connections = self.postgres.postgres_max_connections,
            postgres_connection_timeout_secs = ?self.postgres.postgres_connection_timeout_secs,
            postgres_idle_timeout_secs = ?self.postgres.postgres_idle_timeout_secs,
            postgres_max_lifetime_secs = ?self.postgres.postgres_max_lifetime_secs,
            "Database configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_put_invocation() {
        let cli = Cli::try_parse_from([
            "vellum",
            "--postgres-url",
            "postgresql://localhost/media",
            "--media-bucket",
            "media",
            "--media-provider",
            "memory",
            "put",
            "report.pdf",
            "--meta",
            "owner=ops",
        ])
        .expect("valid arguments");

        assert_eq!(cli.media.bucket, "media");
        assert_eq!(cli.media.provider.to_string(), "memory");
        assert!(!cli.migrate);
        assert!(matches!(cli.command, Command::Put(_)));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn parses_migration_status() {
        let cli = Cli::try_parse_from([
            "vellum",
            "--postgres-url",
            "postgresql://localhost/media",
            "--media-bucket",
            "media",
            "migrate",
            "--status",
        ])
        .expect("valid arguments");

        let Command::Migrate(args) = cli.command else {
            panic!("expected the migrate command");
        };
        assert!(args.status);
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = Cli::try_parse_from([
            "vellum",
            "--postgres-url",
            "postgresql://localhost/media",
            "--media-bucket",
            "media",
            "--media-provider",
            "ftp",
            "health",
        ]);
        assert!(result.is_err());
    }
}
