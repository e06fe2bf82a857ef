use anyhow::Result;
use clap::Parser;
use serde_json::json;

use super::output::to_json;
use chain_cache::config::ChainCacheConfig;
use chain_cache::store::{CacheKind, CacheReport, OpenMode};
use chain_cache::CacheSet;

#[derive(Parser, Debug)]
pub struct ClearCmd {
    /// Kind to clear
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    kind: Option<CacheKind>,

    /// Clear every kind
    #[arg(long)]
    all: bool,
}

impl ClearCmd {
    pub fn execute(&self, config: &ChainCacheConfig, json_output: bool) -> Result<()> {
        let caches = CacheSet::open(&config.settings, OpenMode::ReadWrite)?;
        let mut report = CacheReport::new();
        let cleared = match self.kind {
            Some(kind) => vec![(kind, caches.clear_kind(kind, &mut report)?)],
            None => caches.clear_all(&mut report)?,
        };

        if json_output {
            let counts: serde_json::Map<String, serde_json::Value> = cleared
                .iter()
                .map(|(kind, removed)| (kind.to_string(), json!(removed)))
                .collect();
            println!(
                "{}",
                to_json(&json!({
                    "chain": config.settings.chain,
                    "cleared": counts,
                    "total": report.invalidated,
                }))?
            );
        } else {
            for (kind, removed) in &cleared {
                println!("Cleared {:>6} {} record(s)", removed, kind);
            }
            if cleared.len() > 1 {
                println!("Cleared {:>6} record(s) in total", report.invalidated);
            }
        }
        Ok(())
    }
}
