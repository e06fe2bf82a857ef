//! All eight caches for one chain, addressed by [`CacheKind`].

use chain_cache_store::{
    AbiCache, AnyItem, CacheKey, CacheKind, CacheReport, CacheSettings, CacheStatus, ChainCache,
    CollectionCache, IndexCache, MonitorCache, NameCache, OpenMode, PriceCache, Result,
    SlurpCache,
};
use std::path::Path;
use tracing::info;

/// Run `$body` with `$cache` bound to the typed cache for `$kind`.
macro_rules! with_cache {
    ($set:expr, $kind:expr, |$cache:ident| $body:expr) => {
        match $kind {
            CacheKind::Chain => {
                let $cache = &$set.chain;
                $body
            }
            CacheKind::Abi => {
                let $cache = &$set.abis;
                $body
            }
            CacheKind::Collection => {
                let $cache = &$set.collections;
                $body
            }
            CacheKind::Monitor => {
                let $cache = &$set.monitors;
                $body
            }
            CacheKind::Index => {
                let $cache = &$set.index;
                $body
            }
            CacheKind::Price => {
                let $cache = &$set.prices;
                $body
            }
            CacheKind::Name => {
                let $cache = &$set.names;
                $body
            }
            CacheKind::Slurp => {
                let $cache = &$set.slurps;
                $body
            }
        }
    };
}

pub struct CacheSet {
    settings: CacheSettings,
    pub chain: ChainCache,
    pub abis: AbiCache,
    pub collections: CollectionCache,
    pub monitors: MonitorCache,
    pub index: IndexCache,
    pub prices: PriceCache,
    pub names: NameCache,
    pub slurps: SlurpCache,
}

impl CacheSet {
    /// Open every cache for `settings.chain`. Read-write opens create the
    /// per-chain folder and one directory per kind.
    pub fn open(settings: &CacheSettings, mode: OpenMode) -> Result<Self> {
        Ok(Self {
            settings: settings.clone(),
            chain: ChainCache::open(settings, mode)?,
            abis: AbiCache::open(settings, mode)?,
            collections: CollectionCache::open(settings, mode)?,
            monitors: MonitorCache::open(settings, mode)?,
            index: IndexCache::open(settings, mode)?,
            prices: PriceCache::open(settings, mode)?,
            names: NameCache::open(settings, mode)?,
            slurps: SlurpCache::open(settings, mode)?,
        })
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn dir(&self, kind: CacheKind) -> &Path {
        with_cache!(self, kind, |cache| cache.dir())
    }

    /// Drop every record of `kind`. Returns how many were removed.
    pub fn clear_kind(&self, kind: CacheKind, report: &mut CacheReport) -> Result<usize> {
        let removed = with_cache!(self, kind, |cache| cache.clear(report))?;
        info!(%kind, chain = %self.settings.chain, removed, "cleared cache");
        Ok(removed)
    }

    pub fn clear_all(&self, report: &mut CacheReport) -> Result<Vec<(CacheKind, usize)>> {
        CacheKind::ALL
            .iter()
            .map(|kind| -> Result<(CacheKind, usize)> {
                Ok((*kind, self.clear_kind(*kind, report)?))
            })
            .collect()
    }

    pub fn invalidate(
        &self,
        kind: CacheKind,
        key: &CacheKey,
        report: &mut CacheReport,
    ) -> Result<bool> {
        with_cache!(self, kind, |cache| cache.invalidate(key, report))
    }

    /// The stored record for `key`, regardless of freshness.
    pub fn find(&self, kind: CacheKind, key: &CacheKey) -> Result<Option<AnyItem>> {
        let bytes = with_cache!(self, kind, |cache| cache.store().read_raw(key))?;
        bytes
            .map(|bytes| AnyItem::decode(kind, &bytes).map_err(Into::into))
            .transpose()
    }

    /// Every readable record of `kind`.
    pub fn records(&self, kind: CacheKind) -> Result<Vec<AnyItem>> {
        Ok(match kind {
            CacheKind::Chain => self.chain.items()?.into_iter().map(AnyItem::Chain).collect(),
            CacheKind::Abi => self.abis.items()?.into_iter().map(AnyItem::Abi).collect(),
            CacheKind::Collection => self
                .collections
                .items()?
                .into_iter()
                .map(AnyItem::Collection)
                .collect(),
            CacheKind::Monitor => self
                .monitors
                .items()?
                .into_iter()
                .map(AnyItem::Monitor)
                .collect(),
            CacheKind::Index => self.index.items()?.into_iter().map(AnyItem::Index).collect(),
            CacheKind::Price => self.prices.items()?.into_iter().map(AnyItem::Price).collect(),
            CacheKind::Name => self.names.items()?.into_iter().map(AnyItem::Name).collect(),
            CacheKind::Slurp => self.slurps.items()?.into_iter().map(AnyItem::Slurp).collect(),
        })
    }

    pub fn status(&self) -> Result<CacheStatus> {
        CacheStatus::scan(
            &self.settings.cache_root,
            &self.settings.chain,
            self.settings.stale_lock_after,
        )
    }
}
