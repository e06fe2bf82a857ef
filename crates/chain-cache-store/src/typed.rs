//! Typed read-through cache over a [`CacheStore`].

use crate::codec::CodecError;
use crate::error::{CacheError, Result};
use crate::item::{CacheItem, TimeBasis};
use crate::key::CacheKey;
use crate::paths::check_chain_name;
use crate::report::CacheReport;
use crate::settings::CacheSettings;
use crate::store::{CacheStore, OpenMode, WriteOutcome};
use chain_cache_types::Timestamp;
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, warn};

/// Result of a lookup that never fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Hit(T),
    /// Present but behind the caller's freshness basis.
    Stale(T),
    Miss,
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    /// The cached value, fresh or not.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(item) | Lookup::Stale(item) => Some(item),
            Lookup::Miss => None,
        }
    }
}

/// Produces a fresh value for a key the cache could not serve.
pub trait Fetcher<T> {
    fn fetch(&mut self, key: &CacheKey) -> anyhow::Result<T>;
}

impl<T, F> Fetcher<T> for F
where
    F: FnMut(&CacheKey) -> anyhow::Result<T>,
{
    fn fetch(&mut self, key: &CacheKey) -> anyhow::Result<T> {
        self(key)
    }
}

/// A cache of one item type.
///
/// The cache holds only bytes; every value it returns is freshly decoded and
/// owned by the caller.
///
/// Fetches run outside the shard lock. Two processes that miss the same key at
/// the same time will both fetch, and the later write wins.
#[derive(Debug)]
pub struct TypedCache<T: CacheItem> {
    store: CacheStore,
    bypass: bool,
    ttl: u64,
    _item: PhantomData<fn() -> T>,
}

impl<T: CacheItem> TypedCache<T> {
    /// Open the cache for `T` under `settings`.
    pub fn open(settings: &CacheSettings, mode: OpenMode) -> Result<Self> {
        check_chain_name(&settings.chain)?;
        let store = CacheStore::open(
            settings.kind_dir(T::KIND),
            T::KIND,
            mode,
            settings.lock_options(),
        )?;
        Ok(Self::from_store(store)
            .with_bypass(settings.bypass)
            .with_ttl(settings.ttl_for(T::KIND)))
    }

    pub fn from_store(store: CacheStore) -> Self {
        Self {
            store,
            bypass: false,
            ttl: 0,
            _item: PhantomData,
        }
    }

    /// Always refetch on `get`, ignoring whatever is cached.
    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// Configured TTL in seconds (only meaningful for time-based kinds).
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Look `key` up without fetching.
    ///
    /// Undecodable records are discarded and reported as a miss. Records
    /// written by a newer schema are surfaced as [`CacheError::SchemaMismatch`].
    pub fn lookup(
        &self,
        key: &CacheKey,
        basis: &T::Basis,
        report: &mut CacheReport,
    ) -> Result<Lookup<T>> {
        let Some(bytes) = self.store.read_raw(key)? else {
            debug!(kind = %T::KIND, %key, "cache miss");
            report.record_miss();
            return Ok(Lookup::Miss);
        };

        let item = match T::decode(&bytes) {
            Ok(item) if item.key() == *key => item,
            Ok(item) => {
                let reason = format!("record holds key {}", item.key());
                self.discard(key, &bytes, &reason, report);
                return Ok(Lookup::Miss);
            }
            Err(CodecError::Corrupt(reason)) => {
                self.discard(key, &bytes, &reason, report);
                return Ok(Lookup::Miss);
            }
            Err(e) => return Err(e.into()),
        };

        if item.is_stale(basis) {
            debug!(kind = %T::KIND, %key, "cache stale");
            report.record_stale();
            Ok(Lookup::Stale(item))
        } else {
            debug!(kind = %T::KIND, %key, "cache hit");
            report.record_hit();
            Ok(Lookup::Hit(item))
        }
    }

    /// Return the cached value for `key`, fetching and storing a fresh one
    /// when it is absent, stale, or unreadable.
    ///
    /// `fetcher` runs at most once. If it fails, nothing is written and the
    /// previously cached value (if any) is left in place.
    pub fn get(
        &self,
        key: &CacheKey,
        basis: &T::Basis,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<T>,
    ) -> Result<T> {
        report.record_processed();
        if self.bypass {
            report.record_miss();
        } else if let Lookup::Hit(item) = self.lookup(key, basis, report)? {
            return Ok(item);
        }

        report.record_fetch();
        let item = fetcher.fetch(key).map_err(|source| {
            report.record_fetch_failure();
            warn!(kind = %T::KIND, %key, error = %source, "fetch failed");
            CacheError::FetchFailed {
                key: key.to_string(),
                source,
            }
        })?;
        if item.key() != *key {
            return Err(CacheError::InvalidKey(format!(
                "fetched {} item has key {} but {key} was requested",
                T::KIND,
                item.key()
            )));
        }

        if self.store.mode() == OpenMode::ReadWrite {
            self.write(&item, report)?;
        } else {
            debug!(kind = %T::KIND, %key, "read-only cache, not storing fetched item");
        }
        Ok(item)
    }

    /// Write `item` regardless of what is cached.
    pub fn put(&self, item: &T, report: &mut CacheReport) -> Result<WriteOutcome> {
        report.record_processed();
        self.write(item, report)
    }

    /// Atomically replace the item at `key` with `apply(current)`.
    ///
    /// `apply` receives the decoded current item (an unreadable record reads as
    /// `None`) and returns the item to store, or `None` to leave it alone.
    /// Returns the stored item.
    pub fn update(
        &self,
        key: &CacheKey,
        report: &mut CacheReport,
        apply: impl FnOnce(Option<T>) -> Option<T>,
    ) -> Result<Option<T>> {
        let mut failure = None;
        let mut stored = None;
        let outcome = self.store.update_raw(key, |bytes| {
            let current = match bytes.map(T::decode).transpose() {
                Ok(current) => current.filter(|item| item.key() == *key),
                Err(CodecError::Corrupt(reason)) => {
                    warn!(kind = %T::KIND, %key, %reason, "replacing unreadable record");
                    None
                }
                Err(e) => {
                    failure = Some(CacheError::from(e));
                    return None;
                }
            };
            let next = apply(current)?;
            if let Err(reason) = next.validate() {
                failure = Some(CacheError::InvalidItem(reason));
                return None;
            }
            if next.key() != *key {
                failure = Some(CacheError::InvalidKey(format!(
                    "updated item has key {} but {key} was requested",
                    next.key()
                )));
                return None;
            }
            let encoded = next.encode();
            stored = Some(next);
            Some(encoded)
        });
        if let Some(err) = failure {
            return Err(err);
        }
        let outcome = outcome?;
        if let Some(outcome) = outcome {
            report.record_put();
            if outcome.changed() {
                report.record_changed();
            }
        }
        Ok(stored)
    }

    /// Drop the record for `key`. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey, report: &mut CacheReport) -> Result<bool> {
        let removed = self.store.invalidate(key)?;
        if removed {
            report.record_invalidated(1);
        }
        Ok(removed)
    }

    /// Drop every record. Returns how many were removed.
    pub fn clear(&self, report: &mut CacheReport) -> Result<usize> {
        let removed = self.store.invalidate_all()?;
        report.record_invalidated(removed);
        Ok(removed)
    }

    /// [`get`](Self::get) for each key in order, with a report for the batch.
    ///
    /// Stops at the first error.
    pub fn get_many(
        &self,
        keys: &[CacheKey],
        basis: &T::Basis,
        fetcher: &mut impl Fetcher<T>,
    ) -> Result<(Vec<T>, CacheReport)> {
        let mut report = CacheReport::new();
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            items.push(self.get(key, basis, &mut report, fetcher)?);
        }
        Ok((items, report))
    }

    /// Whether any record, fresh or not, is stored under `key`.
    pub fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.store.read_raw(key)?.is_some())
    }

    /// Every readable item. Undecodable records are skipped.
    pub fn items(&self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for (key, bytes) in self.store.records()? {
            match T::decode(&bytes) {
                Ok(item) => out.push(item),
                Err(CodecError::Corrupt(reason)) => {
                    warn!(kind = %T::KIND, %key, %reason, "skipping unreadable record")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }

    fn write(&self, item: &T, report: &mut CacheReport) -> Result<WriteOutcome> {
        item.validate().map_err(CacheError::InvalidItem)?;
        report.record_put();
        let outcome = self.store.write_raw(&item.key(), &item.encode())?;
        if outcome.changed() {
            report.record_changed();
        }
        Ok(outcome)
    }

    /// Drop the unreadable `bytes` read for `key`, unless a writer has since
    /// replaced them.
    fn discard(&self, key: &CacheKey, bytes: &[u8], reason: &str, report: &mut CacheReport) {
        warn!(kind = %T::KIND, %key, %reason, "discarding corrupt record");
        report.record_corrupt();
        report.record_miss();
        if self.store.mode() == OpenMode::ReadOnly {
            return;
        }
        match self.store.invalidate_if(key, bytes) {
            Ok(true) => {}
            Ok(false) => debug!(kind = %T::KIND, %key, "corrupt record already replaced"),
            Err(e) => warn!(kind = %T::KIND, %key, error = %e, "failed to discard corrupt record"),
        }
    }
}

/// Caches whose freshness is wall-clock time against the configured TTL.
impl<T: CacheItem<Basis = TimeBasis>> TypedCache<T> {
    pub fn time_basis(&self, now: Timestamp) -> TimeBasis {
        TimeBasis::new(now, self.ttl)
    }

    /// [`get`](Self::get) with freshness judged at `now` against the configured TTL.
    pub fn get_at(
        &self,
        key: &CacheKey,
        now: Timestamp,
        report: &mut CacheReport,
        fetcher: &mut impl Fetcher<T>,
    ) -> Result<T> {
        self.get(key, &self.time_basis(now), report, fetcher)
    }

    pub fn lookup_at(
        &self,
        key: &CacheKey,
        now: Timestamp,
        report: &mut CacheReport,
    ) -> Result<Lookup<T>> {
        self.lookup(key, &self.time_basis(now), report)
    }
}
