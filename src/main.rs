use clap::Parser;
use schema_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Stats => cli::inspect::stats().await,
        Command::Status => cli::inspect::status().await,
        Command::Lookup(args) => cli::inspect::lookup(args).await,
        Command::Evict => cli::maintain::evict().await,
        Command::Maintain(args) => cli::maintain::run(args).await,
    }
}
