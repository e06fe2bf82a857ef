use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use super::output::to_json;
use chain_cache::config::ChainCacheConfig;
use chain_cache::store::{CacheKind, CacheStatus};

#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Only report this kind
    #[arg(long)]
    kind: Option<CacheKind>,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    config_file: &'a std::path::Path,
    price_ttl: u64,
    name_ttl: u64,
    bypass: bool,
    #[serde(flatten)]
    status: &'a CacheStatus,
}

impl StatusCmd {
    pub fn execute(&self, config: &ChainCacheConfig, json_output: bool) -> Result<()> {
        let settings = &config.settings;
        let kinds = match self.kind {
            Some(kind) => vec![kind],
            None => CacheKind::ALL.to_vec(),
        };
        let status = CacheStatus::scan_kinds(
            &settings.cache_root,
            &settings.chain,
            &kinds,
            settings.stale_lock_after,
        )
        .with_context(|| format!("scan cache at {}", settings.chain_dir().display()))?;

        if json_output {
            println!(
                "{}",
                to_json(&StatusOutput {
                    config_file: &config.config_file,
                    price_ttl: settings.price_ttl,
                    name_ttl: settings.name_ttl,
                    bypass: settings.bypass,
                    status: &status,
                })?
            );
        } else {
            println!("{}", status.format_status());
            println!();
            println!("  config:    {}", config.config_file.display());
            println!("  price ttl: {}s", settings.price_ttl);
            if settings.name_ttl == 0 {
                println!("  name ttl:  manual");
            } else {
                println!("  name ttl:  {}s", settings.name_ttl);
            }
            if settings.bypass {
                println!("  bypass:    on (every get refetches)");
            }
            let with_temp = status.kinds.iter().filter(|k| k.temp_files > 0).count();
            if with_temp > 0 {
                println!("  {} kind(s) have leftover temp files", with_temp);
            }
        }
        Ok(())
    }
}
