use crate::codec::{CodecError, Decoder, Encoder};
use crate::item::CacheItem;
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::Address;
use serde::{Deserialize, Serialize};

/// A named group of addresses (token list, NFT collection, registry entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub members: Vec<Address>,
    /// Version of the registry the descriptor was read from.
    pub registry_version: u64,
}

impl CollectionItem {
    pub fn contains(&self, member: &Address) -> bool {
        self.members.contains(member)
    }
}

impl CacheItem for CollectionItem {
    const KIND: CacheKind = CacheKind::Collection;
    const VERSION: u16 = 1;

    /// Current registry version.
    type Basis = u64;

    fn key(&self) -> CacheKey {
        CacheKey::address(self.address)
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.name)
            .encode_field(&self.symbol)
            .encode_field(&self.description)
            .encode_field(&self.members)
            .encode_field(&self.registry_version)
            .finish();
    }

    fn decode_payload(payload: &[u8], _version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (name, decoder) = decoder.decode_field("name")?;
        let (symbol, decoder) = decoder.decode_field("symbol")?;
        let (description, decoder) = decoder.decode_field("description")?;
        let (members, decoder) = decoder.decode_field("members")?;
        let (registry_version, decoder) = decoder.decode_field("registry_version")?;
        decoder.finish_all()?;
        Ok(Self {
            address,
            name,
            symbol,
            description,
            members,
            registry_version,
        })
    }

    fn is_stale(&self, current_version: &u64) -> bool {
        self.registry_version < *current_version
    }
}
