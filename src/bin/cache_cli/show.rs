use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use super::output::{format_item, to_json};
use chain_cache::config::ChainCacheConfig;
use chain_cache::store::{CacheError, CacheKey, CacheKind, OpenMode};
use chain_cache::CacheSet;

#[derive(Parser, Debug)]
pub struct ShowCmd {
    /// Cache kind (chain, abi, collection, monitor, index, price, name, slurp)
    kind: CacheKind,

    /// Record key; lists every record of the kind when omitted
    key: Option<String>,

    /// Maximum number of records to list
    #[arg(long)]
    limit: Option<usize>,
}

impl ShowCmd {
    pub fn execute(&self, config: &ChainCacheConfig, json_output: bool) -> Result<()> {
        // Inspection never creates directories; a cache that was never
        // written reads as empty.
        let caches = match CacheSet::open(&config.settings, OpenMode::ReadOnly) {
            Ok(caches) => Some(caches),
            Err(CacheError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(text) = &self.key {
            let key = CacheKey::parse(self.kind, text).with_context(|| {
                format!("{} keys look like {}", self.kind, self.kind.key_hint())
            })?;
            let item = match &caches {
                Some(caches) => caches.find(self.kind, &key)?,
                None => None,
            };
            if json_output {
                println!(
                    "{}",
                    to_json(&json!({
                        "kind": self.kind,
                        "key": key.to_string(),
                        "found": item.is_some(),
                        "record": item,
                    }))?
                );
            } else {
                match &item {
                    Some(item) => println!("{}", format_item(item)),
                    None => println!("No {} record for {}", self.kind, key),
                }
            }
            return Ok(());
        }

        let mut records = match &caches {
            Some(caches) => caches.records(self.kind)?,
            None => Vec::new(),
        };
        let total = records.len();
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        if json_output {
            println!(
                "{}",
                to_json(&json!({
                    "kind": self.kind,
                    "total": total,
                    "records": records,
                }))?
            );
        } else {
            println!(
                "{} {} record(s) in {}",
                total,
                self.kind,
                config.settings.kind_dir(self.kind).display()
            );
            for item in &records {
                println!("  {}", format_item(item));
            }
            if records.len() < total {
                println!("  ... {} more", total - records.len());
            }
        }
        Ok(())
    }
}
