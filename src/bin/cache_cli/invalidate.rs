use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use super::output::to_json;
use chain_cache::config::ChainCacheConfig;
use chain_cache::store::{CacheKey, CacheKind, CacheReport, OpenMode};
use chain_cache::CacheSet;

#[derive(Parser, Debug)]
pub struct InvalidateCmd {
    /// Cache kind (chain, abi, collection, monitor, index, price, name, slurp)
    kind: CacheKind,

    /// Record key: address, chain id, first-last block range, addr:addr or addr:tag
    key: String,
}

impl InvalidateCmd {
    pub fn execute(&self, config: &ChainCacheConfig, json_output: bool) -> Result<()> {
        let key = CacheKey::parse(self.kind, &self.key)
            .with_context(|| format!("{} keys look like {}", self.kind, self.kind.key_hint()))?;
        let caches = CacheSet::open(&config.settings, OpenMode::ReadWrite)?;
        let mut report = CacheReport::new();
        let removed = caches.invalidate(self.kind, &key, &mut report)?;

        if json_output {
            println!(
                "{}",
                to_json(&json!({
                    "kind": self.kind,
                    "key": key.to_string(),
                    "removed": removed,
                }))?
            );
        } else if removed {
            println!("Removed {} record {}", self.kind, key);
        } else {
            println!("No {} record for {}", self.kind, key);
        }
        Ok(())
    }
}
