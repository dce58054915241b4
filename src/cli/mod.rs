//! CLI module for the schema cache
//!
//! Subcommands inspect and maintain a cache configured through
//! `config/default`, `config/local` and `APP__*` variables. Results are
//! printed to stdout as JSON.

pub mod inspect;
pub mod maintain;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Schema Semantic Cache - reuse generated schemas for similar prompts
#[derive(Parser)]
#[command(name = "schema-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print aggregate cache statistics
    Stats,

    /// Print embedding provider status
    Status,

    /// Look up a cached schema for a prompt
    Lookup(inspect::LookupArgs),

    /// Run one eviction pass
    Evict,

    /// Run eviction periodically until interrupted
    Maintain(maintain::MaintainArgs),
}

/// Load `.env` and configuration, then start logging
pub fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    config
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookup() {
        let cli = Cli::parse_from(["schema-cache", "lookup", "a blog", "--threshold", "0.9"]);

        match cli.command {
            Command::Lookup(args) => {
                assert_eq!(args.prompt, "a blog");
                assert_eq!(args.threshold, Some(0.9));
            }
            _ => panic!("expected lookup"),
        }
    }

    #[test]
    fn test_parse_maintain_interval() {
        let cli = Cli::parse_from(["schema-cache", "maintain", "--interval-secs", "30"]);

        match cli.command {
            Command::Maintain(args) => assert_eq!(args.interval_secs, Some(30)),
            _ => panic!("expected maintain"),
        }
    }

    #[test]
    fn test_parse_simple_commands() {
        assert!(matches!(
            Cli::parse_from(["schema-cache", "stats"]).command,
            Command::Stats
        ));
        assert!(matches!(
            Cli::parse_from(["schema-cache", "evict"]).command,
            Command::Evict
        ));
    }
}
