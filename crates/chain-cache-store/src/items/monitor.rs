use crate::codec::{CodecError, Decode, Decoder, Encode, Encoder};
use crate::item::CacheItem;
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::{Address, BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};

/// Subscription state of a monitored address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    #[default]
    Active,
    Paused,
    Deleted,
}

impl Encode for MonitorState {
    fn encode(&self, buf: &mut Vec<u8>) {
        let tag: u8 = match self {
            MonitorState::Active => 0,
            MonitorState::Paused => 1,
            MonitorState::Deleted => 2,
        };
        tag.encode(buf);
    }
}

impl Decode for MonitorState {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (tag, rest) = u8::decode_unfinished(buf)?;
        let state = match tag {
            0 => MonitorState::Active,
            1 => MonitorState::Paused,
            2 => MonitorState::Deleted,
            other => {
                return Err(CodecError::corrupt(format!(
                    "unknown monitor state {other}"
                )))
            }
        };
        Ok((state, rest))
    }
}

/// Scan progress for one watched address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorItem {
    pub address: Address,
    pub first_block: BlockNumber,
    pub last_scanned_block: BlockNumber,
    pub appearance_count: u64,
    pub state: MonitorState,
    pub updated_at: Timestamp,
}

impl MonitorItem {
    pub fn new(address: Address, first_block: BlockNumber, now: Timestamp) -> Self {
        Self {
            address,
            first_block,
            last_scanned_block: first_block,
            appearance_count: 0,
            state: MonitorState::Active,
            updated_at: now,
        }
    }

    /// Record a scan up to `scanned_to`. Progress never moves backwards;
    /// returns false (and changes nothing) for a scan that is not ahead.
    pub fn advance(
        &mut self,
        scanned_to: BlockNumber,
        new_appearances: u64,
        now: Timestamp,
    ) -> bool {
        if scanned_to <= self.last_scanned_block {
            return false;
        }
        self.last_scanned_block = scanned_to;
        self.appearance_count = self.appearance_count.saturating_add(new_appearances);
        self.updated_at = now;
        true
    }
}

impl CacheItem for MonitorItem {
    const KIND: CacheKind = CacheKind::Monitor;
    const VERSION: u16 = 1;

    /// Chain tip.
    type Basis = BlockNumber;

    fn key(&self) -> CacheKey {
        CacheKey::address(self.address)
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.first_block)
            .encode_field(&self.last_scanned_block)
            .encode_field(&self.appearance_count)
            .encode_field(&self.state)
            .encode_field(&self.updated_at)
            .finish();
    }

    fn decode_payload(payload: &[u8], _version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (first_block, decoder) = decoder.decode_field("first_block")?;
        let (last_scanned_block, decoder) = decoder.decode_field("last_scanned_block")?;
        let (appearance_count, decoder) = decoder.decode_field("appearance_count")?;
        let (state, decoder) = decoder.decode_field("state")?;
        let (updated_at, decoder) = decoder.decode_field("updated_at")?;
        decoder.finish_all()?;
        Ok(Self {
            address,
            first_block,
            last_scanned_block,
            appearance_count,
            state,
            updated_at,
        })
    }

    /// Paused and deleted monitors are not expected to keep up with the tip.
    fn is_stale(&self, tip: &BlockNumber) -> bool {
        self.state == MonitorState::Active && self.last_scanned_block < *tip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MonitorItem {
        let address = "0xf503017d7baf7fbc0fff7492b751025c6a78179b".parse().unwrap();
        let mut item = MonitorItem::new(address, 100, 1_000);
        item.advance(500, 7, 2_000);
        item
    }

    #[test]
    fn test_round_trip() {
        let item = sample();
        assert_eq!(MonitorItem::decode(&item.encode()).unwrap(), item);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut item = sample();
        assert!(!item.advance(400, 3, 3_000));
        assert!(!item.advance(500, 3, 3_000));
        assert_eq!(item.last_scanned_block, 500);
        assert_eq!(item.appearance_count, 7);
        assert_eq!(item.updated_at, 2_000);

        assert!(item.advance(600, 3, 3_000));
        assert_eq!(item.appearance_count, 10);
    }

    #[test]
    fn test_only_active_monitors_go_stale() {
        let mut item = sample();
        assert!(!item.is_stale(&500));
        assert!(item.is_stale(&501));
        item.state = MonitorState::Paused;
        assert!(!item.is_stale(&501));
        item.state = MonitorState::Deleted;
        assert!(!item.is_stale(&10_000));
    }
}
