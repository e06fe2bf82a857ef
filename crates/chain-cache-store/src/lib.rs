//! Filesystem-backed typed cache for chain metadata.
//!
//! Each object type lives in its own directory of sharded binary files:
//!
//! ```text
//! <cache_root>/<chain>/
//!   chain/        head snapshots, keyed by chain id
//!   abis/         contract interfaces, keyed by address
//!   collections/  address groups, keyed by address
//!   monitors/     scan progress, keyed by address
//!   index/        index chunk descriptors, keyed by block range
//!   prices/       price quotes, keyed by token/quote pair
//!   names/        address labels, keyed by address
//!   slurps/       raw explorer responses, keyed by address and source
//! ```
//!
//! [`CacheStore`] handles the files: layout, locking, atomic writes and
//! damage recovery. [`TypedCache`] layers item decoding, staleness and
//! read-through fetching on top. The eight concrete caches are aliases such
//! as [`AbiCache`].
//!
//! # Example
//!
//! ```no_run
//! use chain_cache_store::{
//!     AbiCache, AbiItem, Address, CacheKey, CacheReport, CacheSettings, Hash, OpenMode,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = CacheSettings::new("/tmp/chain-cache", "mainnet");
//! let abis = AbiCache::open(&settings, OpenMode::ReadWrite)?;
//! let address: Address = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse()?;
//! let code_hash: Hash = "0x01".parse()?;
//!
//! let mut report = CacheReport::new();
//! let mut fetch = |_: &CacheKey| -> anyhow::Result<AbiItem> {
//!     Ok(AbiItem { address, code_hash, entries: vec![] })
//! };
//! let abi = abis.get_for_code(address, &code_hash, &mut report, &mut fetch)?;
//! println!("{} entries\n{}", abi.entries.len(), report.format_report());
//! # Ok(())
//! # }
//! ```

pub mod caches;
pub mod codec;
pub mod error;
pub mod item;
pub mod items;
pub mod key;
pub mod lock;
pub mod paths;
pub mod report;
pub mod settings;
pub mod status;
pub mod store;
pub mod typed;

pub use chain_cache_types::{Address, Hash};

pub use caches::{
    AbiCache, ChainCache, CollectionCache, IndexCache, MonitorCache, NameCache, PriceCache,
    SlurpCache,
};
pub use codec::CodecError;
pub use error::{CacheError, Result};
pub use item::{BasisProvider, CacheItem, TimeBasis};
pub use items::{
    AbiEntry, AbiEntryKind, AbiItem, AnyItem, ChainItem, CollectionItem, IndexItem, MonitorItem,
    MonitorState, NameItem, PriceItem, SlurpItem,
};
pub use key::{CacheKey, CacheKind};
pub use lock::{LockInfo, LockOptions};
pub use report::CacheReport;
pub use settings::CacheSettings;
pub use status::{CacheStatus, KindStatus};
pub use store::{CacheStore, OpenMode, WriteOutcome};
pub use typed::{Fetcher, Lookup, TypedCache};
