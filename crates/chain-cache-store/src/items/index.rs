use crate::codec::{CodecError, Decoder, Encoder};
use crate::item::CacheItem;
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::{BlockNumber, Hash};
use serde::{Deserialize, Serialize};

/// Descriptor of one finalized appearance-index chunk.
///
/// Chunks cover a closed block range and are immutable once published, so an
/// index record is never stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    pub first_block: BlockNumber,
    pub last_block: BlockNumber,
    pub appearance_count: u64,
    pub address_count: u64,
    pub chunk_hash: Hash,
    /// Content identifier of the pinned chunk.
    pub ipfs_cid: String,
}

impl IndexItem {
    pub fn covers(&self, block: BlockNumber) -> bool {
        (self.first_block..=self.last_block).contains(&block)
    }

    /// Number of blocks in the chunk, or `None` when the range is inverted or
    /// spans the whole `u64` domain.
    pub fn block_count(&self) -> Option<u64> {
        self.last_block
            .checked_sub(self.first_block)
            .and_then(|span| span.checked_add(1))
    }
}

impl CacheItem for IndexItem {
    const KIND: CacheKind = CacheKind::Index;
    const VERSION: u16 = 1;

    type Basis = BlockNumber;

    fn key(&self) -> CacheKey {
        CacheKey::block_range(self.first_block, self.last_block)
    }

    fn validate(&self) -> Result<(), String> {
        if self.first_block > self.last_block {
            return Err(format!(
                "index chunk range {}-{} is inverted",
                self.first_block, self.last_block
            ));
        }
        Ok(())
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.first_block)
            .encode_field(&self.last_block)
            .encode_field(&self.appearance_count)
            .encode_field(&self.address_count)
            .encode_field(&self.chunk_hash)
            .encode_field(&self.ipfs_cid)
            .finish();
    }

    fn decode_payload(payload: &[u8], _version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (first_block, decoder) = decoder.decode_field::<u64>("first_block")?;
        let (last_block, decoder) = decoder.decode_field::<u64>("last_block")?;
        let (appearance_count, decoder) = decoder.decode_field("appearance_count")?;
        let (address_count, decoder) = decoder.decode_field("address_count")?;
        let (chunk_hash, decoder) = decoder.decode_field("chunk_hash")?;
        let (ipfs_cid, decoder) = decoder.decode_field("ipfs_cid")?;
        decoder.finish_all()?;
        if first_block > last_block {
            return Err(CodecError::corrupt(format!(
                "index range {first_block}-{last_block} is inverted"
            )));
        }
        Ok(Self {
            first_block,
            last_block,
            appearance_count,
            address_count,
            chunk_hash,
            ipfs_cid,
        })
    }

    fn is_stale(&self, _block: &BlockNumber) -> bool {
        false
    }
}
