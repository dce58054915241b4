//! Read-side commands: stats, status and lookup

use clap::Args;
use serde_json::json;

use super::{bootstrap, print_json};

/// Arguments for the lookup command
#[derive(Args, Clone)]
pub struct LookupArgs {
    /// Prompt to look up
    pub prompt: String,

    /// Similarity threshold (overrides config)
    #[arg(long)]
    pub threshold: Option<f32>,
}

/// Print aggregate statistics
pub async fn stats() -> anyhow::Result<()> {
    let config = bootstrap();
    let service = crate::create_cache_service(&config).await?;

    print_json(&service.get_stats().await?)
}

/// Print embedding provider status
pub async fn status() -> anyhow::Result<()> {
    let config = bootstrap();
    let service = crate::create_cache_service(&config).await?;

    print_json(&service.get_embedding_status())
}

/// Look up a prompt and print the hit, if any
pub async fn lookup(args: LookupArgs) -> anyhow::Result<()> {
    let config = bootstrap();
    let service = crate::create_cache_service(&config).await?;

    let hit = service.find_similar(&args.prompt, args.threshold).await?;
    let cost_saved = hit
        .as_ref()
        .map(|h| service.calculate_cost_savings(h.entry.tokens_used()))
        .unwrap_or(0.0);

    print_json(&json!({
        "hit": hit,
        "cost_saved": cost_saved,
    }))
}
