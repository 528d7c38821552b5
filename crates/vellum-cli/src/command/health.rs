//! Health commands: `health` and `monitor`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use vellum_service::{HealthMonitor, MediaStore, TracingReporter};

use super::MonitorArgs;
use crate::TRACING_TARGET_COMMAND;
use crate::shutdown::shutdown_signal;

/// Interval used when neither the flag nor the configuration sets one.
const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);

pub async fn check(store: &MediaStore) -> anyhow::Result<()> {
    let report = store
        .health_check()
        .await
        .context("blob store health check failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub async fn monitor(store: &MediaStore, args: MonitorArgs) -> anyhow::Result<()> {
    let interval = resolve_interval(&args, store)?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        interval_secs = interval.as_secs(),
        "Monitoring blob store health, press Ctrl-C to stop"
    );

    let handle = HealthMonitor::new(store.clone(), interval)
        .with_reporter(Arc::new(TracingReporter))
        .spawn();

    shutdown_signal().await;
    handle.shutdown().await;
    Ok(())
}

fn resolve_interval(args: &MonitorArgs, store: &MediaStore) -> anyhow::Result<Duration> {
    match args.interval_secs {
        Some(0) => anyhow::bail!("interval must be at least one second"),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(store
            .health_check_interval()
            .unwrap_or(DEFAULT_MONITOR_INTERVAL)),
    }
}
