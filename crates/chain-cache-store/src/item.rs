//! The contract every cached object type implements.

use crate::codec::{decode_versioned, encode_versioned, CodecError};
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::Timestamp;

/// A record type that can live in a typed cache.
///
/// Items encode only their payload; [`encode`](CacheItem::encode) wraps it in
/// a `u16` schema version so older builds can refuse newer records instead of
/// misreading them.
pub trait CacheItem: Sized {
    const KIND: CacheKind;

    /// Current payload schema version. Bump when the payload layout changes.
    const VERSION: u16;

    /// What the caller compares against to decide freshness.
    type Basis;

    /// Key this item is stored under.
    fn key(&self) -> CacheKey;

    fn encode_payload(&self, buf: &mut Vec<u8>);

    /// Decode a payload written at schema `version` (never newer than `VERSION`).
    fn decode_payload(payload: &[u8], version: u16) -> Result<Self, CodecError>;

    fn is_stale(&self, basis: &Self::Basis) -> bool;

    /// Reject field values that must never be stored. Returns the reason.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn encode(&self) -> Vec<u8> {
        encode_versioned(Self::VERSION, |buf| self.encode_payload(buf))
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (version, payload) = decode_versioned(bytes, Self::VERSION)?;
        Self::decode_payload(payload, version)
    }
}

/// Freshness basis for wall-clock expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBasis {
    pub now: Timestamp,
    /// Seconds an item stays fresh after its timestamp.
    pub ttl: u64,
}

impl TimeBasis {
    pub fn new(now: Timestamp, ttl: u64) -> Self {
        Self { now, ttl }
    }

    /// Whether something stamped at `stamped` has outlived the TTL.
    ///
    /// Fresh through `stamped + ttl` inclusive.
    pub fn expired(&self, stamped: Timestamp) -> bool {
        self.now > stamped.saturating_add(self.ttl)
    }
}

/// Source of the current freshness basis, for callers deriving it from chain state.
pub trait BasisProvider {
    /// Latest known block on the chain.
    fn latest_block(&self) -> anyhow::Result<u64>;

    fn now(&self) -> Timestamp {
        chain_cache_types::unix_now()
    }
}
