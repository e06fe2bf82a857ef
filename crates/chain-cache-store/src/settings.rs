//! Resolved runtime settings for opening caches.

use crate::key::CacheKind;
use crate::lock::{LockOptions, DEFAULT_LOCK_TIMEOUT, DEFAULT_STALE_LOCK};
use crate::paths;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CHAIN: &str = "mainnet";

/// Seconds a cached price stays fresh.
pub const DEFAULT_PRICE_TTL: u64 = 300;

/// Names never expire by default.
pub const DEFAULT_NAME_TTL: u64 = 0;

/// Where caches live and how they behave.
///
/// Building one from files and the environment is the caller's job; this type
/// only carries the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub cache_root: PathBuf,
    pub chain: String,
    pub price_ttl: u64,
    pub name_ttl: u64,
    pub lock_timeout: Duration,
    pub stale_lock_after: Duration,
    /// Ignore cached values and refetch on every get.
    pub bypass: bool,
}

impl CacheSettings {
    pub fn new(cache_root: impl Into<PathBuf>, chain: impl Into<String>) -> Self {
        Self {
            cache_root: cache_root.into(),
            chain: chain.into(),
            price_ttl: DEFAULT_PRICE_TTL,
            name_ttl: DEFAULT_NAME_TTL,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_lock_after: DEFAULT_STALE_LOCK,
            bypass: false,
        }
    }

    pub fn chain_dir(&self) -> PathBuf {
        self.cache_root.join(&self.chain)
    }

    pub fn kind_dir(&self, kind: CacheKind) -> PathBuf {
        paths::kind_dir(&self.cache_root, &self.chain, kind)
    }

    /// Configured TTL for time-based kinds, zero for the rest.
    pub fn ttl_for(&self, kind: CacheKind) -> u64 {
        match kind {
            CacheKind::Price => self.price_ttl,
            CacheKind::Name => self.name_ttl,
            _ => 0,
        }
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            timeout: self.lock_timeout,
            stale_after: self.stale_lock_after,
            ..LockOptions::default()
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }
}
