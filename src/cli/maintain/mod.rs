//! Maintenance commands: one-shot and periodic eviction

use std::time::Duration;

use clap::Args;
use tracing::info;

use super::{bootstrap, print_json};

/// Arguments for the maintain command
#[derive(Args, Clone)]
pub struct MaintainArgs {
    /// Seconds between eviction passes (overrides config)
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

/// Run one eviction pass and print the report
pub async fn evict() -> anyhow::Result<()> {
    let config = bootstrap();
    let service = crate::create_cache_service(&config).await?;

    let report = crate::create_eviction_job(&service).run_once().await?;

    print_json(&report)
}

/// Run eviction on an interval until Ctrl-C
pub async fn run(args: MaintainArgs) -> anyhow::Result<()> {
    let config = bootstrap();
    let service = crate::create_cache_service(&config).await?;

    let interval = args
        .interval_secs
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| config.cache.eviction_interval());

    info!(interval_secs = interval.as_secs(), "Starting eviction loop");

    let handle = crate::create_eviction_job(&service).spawn(interval);

    tokio::signal::ctrl_c().await?;
    handle.abort();

    info!("Eviction loop stopped");

    Ok(())
}
