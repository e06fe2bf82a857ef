use crate::codec::{CodecError, Decoder, Encoder};
use crate::item::CacheItem;
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::{BlockNumber, Hash, Timestamp};
use serde::{Deserialize, Serialize};

/// Snapshot of a chain's head as last observed from its node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainItem {
    pub chain: String,
    pub chain_id: u64,
    pub head_block: BlockNumber,
    pub head_hash: Hash,
    pub head_timestamp: Timestamp,
    pub client_version: String,
}

impl CacheItem for ChainItem {
    const KIND: CacheKind = CacheKind::Chain;
    const VERSION: u16 = 1;

    /// Latest block number seen on the chain.
    type Basis = BlockNumber;

    fn key(&self) -> CacheKey {
        CacheKey::chain(self.chain_id)
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.chain)
            .encode_field(&self.chain_id)
            .encode_field(&self.head_block)
            .encode_field(&self.head_hash)
            .encode_field(&self.head_timestamp)
            .encode_field(&self.client_version)
            .finish();
    }

    fn decode_payload(payload: &[u8], _version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (chain, decoder) = decoder.decode_field("chain")?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (head_block, decoder) = decoder.decode_field("head_block")?;
        let (head_hash, decoder) = decoder.decode_field("head_hash")?;
        let (head_timestamp, decoder) = decoder.decode_field("head_timestamp")?;
        let (client_version, decoder) = decoder.decode_field("client_version")?;
        decoder.finish_all()?;
        Ok(Self {
            chain,
            chain_id,
            head_block,
            head_hash,
            head_timestamp,
            client_version,
        })
    }

    fn is_stale(&self, latest: &BlockNumber) -> bool {
        self.head_block < *latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChainItem {
        ChainItem {
            chain: "mainnet".into(),
            chain_id: 1,
            head_block: 19_000_000,
            head_hash: "0xbeef".parse().unwrap(),
            head_timestamp: 1_700_000_000,
            client_version: "erigon/2.60".into(),
        }
    }

    #[test]
    fn test_round_trip() {
        let item = sample();
        assert_eq!(ChainItem::decode(&item.encode()).unwrap(), item);
        assert_eq!(item.key(), CacheKey::chain(1));
    }

    #[test]
    fn test_stale_when_chain_moved_on() {
        let item = sample();
        assert!(!item.is_stale(&19_000_000));
        assert!(!item.is_stale(&18_999_999));
        assert!(item.is_stale(&19_000_001));
    }
}
