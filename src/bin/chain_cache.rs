//! chain-cache: inspect and maintain the on-disk chain metadata cache
//!
//! ## Example Usage
//!
//! ```bash
//! # Records, bytes and damaged shards per cache kind
//! chain-cache status
//!
//! # Drop every cached price on sepolia
//! chain-cache --chain sepolia clear --kind price
//!
//! # Forget one ABI so it is refetched
//! chain-cache invalidate abi 0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48
//!
//! # Print a cached index chunk as JSON
//! chain-cache --json show index 0-999
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chain_cache::config::{ChainCacheConfig, Overrides};

mod cache_cli;

use cache_cli::{clear::ClearCmd, invalidate::InvalidateCmd, show::ShowCmd, status::StatusCmd};

#[derive(Parser)]
#[command(
    name = "chain-cache",
    author,
    version,
    about = "Inspect and maintain the chain metadata cache"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cache root directory (overrides CHAIN_CACHE_ROOT and chain-cache.toml)
    #[arg(long, global = true)]
    cache_root: Option<PathBuf>,

    /// Chain whose caches to operate on (default: mainnet)
    #[arg(long, global = true)]
    chain: Option<String>,

    /// Ignore cached values when reading through
    #[arg(long, global = true)]
    bypass: bool,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show on-disk status per cache kind
    Status(StatusCmd),

    /// Remove every record of one kind, or of all kinds
    Clear(ClearCmd),

    /// Remove a single record
    Invalidate(InvalidateCmd),

    /// Decode and print one record, or list a kind's records
    Show(ShowCmd),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("chain_cache=debug,chain_cache_store=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let Cli {
        command,
        cache_root,
        chain,
        bypass,
        json,
        verbose,
    } = Cli::parse();
    init_tracing(verbose);

    let result = ChainCacheConfig::load(&Overrides {
        cache_root,
        chain,
        bypass,
    })
    .and_then(|config| match command {
        Commands::Status(cmd) => cmd.execute(&config, json),
        Commands::Clear(cmd) => cmd.execute(&config, json),
        Commands::Invalidate(cmd) => cmd.execute(&config, json),
        Commands::Show(cmd) => cmd.execute(&config, json),
    });

    if let Err(err) = &result {
        eprint!("{}", cache_cli::output::format_error(err, json));
        std::process::exit(1);
    }
    result
}
