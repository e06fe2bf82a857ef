//! The eight typed caches and their type-specific operations.

use crate::error::Result;
use crate::item::{CacheItem, TimeBasis};
use crate::items::{
    AbiItem, ChainItem, CollectionItem, IndexItem, MonitorItem, NameItem, PriceItem, SlurpItem,
};
use crate::key::CacheKey;
use crate::report::CacheReport;
use crate::typed::{Fetcher, TypedCache};
use chain_cache_types::{Address, BlockNumber, Hash, Timestamp};

pub type ChainCache = TypedCache<ChainItem>;
pub type AbiCache = TypedCache<AbiItem>;
pub type CollectionCache = TypedCache<CollectionItem>;
pub type MonitorCache = TypedCache<MonitorItem>;
pub type IndexCache = TypedCache<IndexItem>;
pub type PriceCache = TypedCache<PriceItem>;
pub type NameCache = TypedCache<NameItem>;
pub type SlurpCache = TypedCache<SlurpItem>;

impl TypedCache<ChainItem> {
    /// Forget the head snapshot for `chain_id` after a reorganization.
    pub fn on_reorg(&self, chain_id: u64, report: &mut CacheReport) -> Result<bool> {
        self.invalidate(&CacheKey::chain(chain_id), report)
    }

    pub fn get_head(
        &self,
        chain_id: u64,
        latest: BlockNumber,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<ChainItem>,
    ) -> Result<ChainItem> {
        self.get(&CacheKey::chain(chain_id), &latest, report, fetcher)
    }
}

impl TypedCache<AbiItem> {
    /// Interface for `address`, refetched whenever its code hash changes.
    pub fn get_for_code(
        &self,
        address: Address,
        code_hash: &Hash,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<AbiItem>,
    ) -> Result<AbiItem> {
        self.get(&CacheKey::address(address), code_hash, report, fetcher)
    }
}

impl TypedCache<CollectionItem> {
    pub fn get_collection(
        &self,
        address: Address,
        registry_version: u64,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<CollectionItem>,
    ) -> Result<CollectionItem> {
        self.get(&CacheKey::address(address), &registry_version, report, fetcher)
    }
}

impl TypedCache<MonitorItem> {
    /// Advance an existing monitor to `scanned_to`.
    ///
    /// Runs under the shard lock, so concurrent scanners cannot move a monitor
    /// backwards. Returns the updated monitor, or `None` when the address is
    /// not monitored or the scan is not ahead of what is recorded.
    pub fn record_scan(
        &self,
        address: Address,
        scanned_to: BlockNumber,
        new_appearances: u64,
        now: Timestamp,
        report: &mut CacheReport,
    ) -> Result<Option<MonitorItem>> {
        self.update(&CacheKey::address(address), report, |current| {
            let mut monitor = current?;
            monitor
                .advance(scanned_to, new_appearances, now)
                .then_some(monitor)
        })
    }

    /// Monitor state, refreshed when it has fallen behind `tip`.
    pub fn get_at_tip(
        &self,
        address: Address,
        tip: BlockNumber,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<MonitorItem>,
    ) -> Result<MonitorItem> {
        self.get(&CacheKey::address(address), &tip, report, fetcher)
    }
}

impl TypedCache<IndexItem> {
    /// Store `item` unless its range is already cached. Chunks are immutable,
    /// so an existing record is never replaced. Returns whether it was stored.
    pub fn append(&self, item: IndexItem, report: &mut CacheReport) -> Result<bool> {
        let key = item.key();
        report.record_processed();
        let stored = self.update(&key, report, |current| match current {
            Some(_) => None,
            None => Some(item),
        })?;
        Ok(stored.is_some())
    }

    /// The cached chunk whose range includes `block`, if any.
    pub fn find_covering(&self, block: BlockNumber) -> Result<Option<IndexItem>> {
        Ok(self.items()?.into_iter().find(|item| item.covers(block)))
    }
}

impl TypedCache<PriceItem> {
    pub fn get_price(
        &self,
        token: Address,
        quote: Address,
        now: Timestamp,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<PriceItem>,
    ) -> Result<PriceItem> {
        self.get_at(&CacheKey::address_pair(token, quote), now, report, fetcher)
    }
}

impl TypedCache<NameItem> {
    pub fn get_name(
        &self,
        address: Address,
        now: Timestamp,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<NameItem>,
    ) -> Result<NameItem> {
        self.get_at(&CacheKey::address(address), now, report, fetcher)
    }
}

impl TypedCache<SlurpItem> {
    /// Explorer response for `address`/`source`, refetched once older than `max_age` seconds.
    pub fn get_slurp(
        &self,
        address: Address,
        source: &str,
        now: Timestamp,
        max_age: u64,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<SlurpItem>,
    ) -> Result<SlurpItem> {
        self.get(
            &CacheKey::address_tagged(address, source),
            &TimeBasis::new(now, max_age),
            report,
            fetcher,
        )
    }
}
