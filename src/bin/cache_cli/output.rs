//! Output formatting for the chain-cache CLI

use chain_cache::store::{AnyItem, CacheError};
use serde::Serialize;

/// Pretty JSON for any serializable value.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Format an error for display
pub fn format_error(error: &anyhow::Error, json_output: bool) -> String {
    if json_output {
        #[derive(Serialize)]
        struct ErrorJson {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            code: Option<&'static str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            cause: Option<String>,
        }

        let err = ErrorJson {
            error: error.to_string(),
            code: error
                .downcast_ref::<CacheError>()
                .map(CacheError::error_code),
            cause: error.source().map(|e| e.to_string()),
        };
        let mut out = serde_json::to_string_pretty(&err).unwrap_or_else(|_| "{}".to_string());
        out.push('\n');
        out
    } else {
        let mut out = format!("Error: {}\n", error);
        let mut causes = error.chain().skip(1).peekable();
        if causes.peek().is_some() {
            out.push_str("Caused by:\n");
            for (idx, cause) in causes.enumerate() {
                out.push_str(&format!("  {}: {}\n", idx + 1, cause));
            }
        }
        out
    }
}

/// One-line summary of a cached record.
pub fn format_item(item: &AnyItem) -> String {
    let key = item.key();
    let detail = match item {
        AnyItem::Chain(chain) => format!(
            "{} (id {}) head {} at {}",
            chain.chain, chain.chain_id, chain.head_block, chain.head_timestamp
        ),
        AnyItem::Abi(abi) => format!("{} entries, code {}", abi.entries.len(), abi.code_hash),
        AnyItem::Collection(collection) => format!(
            "{} ({} members, registry v{})",
            collection.name,
            collection.members.len(),
            collection.registry_version
        ),
        AnyItem::Monitor(monitor) => format!(
            "{:?} from {} scanned to {}, {} appearances",
            monitor.state,
            monitor.first_block,
            monitor.last_scanned_block,
            monitor.appearance_count
        ),
        AnyItem::Index(index) => format!(
            "{} appearances, {} addresses, {}",
            index.appearance_count, index.address_count, index.ipfs_cid
        ),
        AnyItem::Price(price) => format!(
            "{} from {} at block {}",
            price.price, price.source, price.block
        ),
        AnyItem::Name(name) => {
            if name.tags.is_empty() {
                name.name.clone()
            } else {
                format!("{} [{}]", name.name, name.tags)
            }
        }
        AnyItem::Slurp(slurp) => format!(
            "{} bytes fetched at {}",
            slurp.payload.len(),
            slurp.fetched_at
        ),
    };
    format!("{key}  {detail}")
}
