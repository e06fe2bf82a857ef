//! chain-cache: typed on-disk cache for blockchain metadata.
//!
//! The storage engine lives in [`chain_cache_store`]. This crate adds what a
//! process needs around it:
//!
//! - [`config`]: resolve cache location, chain and TTLs from flags, the
//!   environment and `chain-cache.toml`
//! - [`cache_set`]: all eight caches of one chain behind a single handle
//!
//! The `chain-cache` binary builds on both for status and maintenance.

pub mod cache_set;
pub mod config;

pub use cache_set::CacheSet;
pub use config::{ChainCacheConfig, ConfigFile, EnvKnobs, Overrides};

pub use chain_cache_store as store;
pub use chain_cache_types as types;
