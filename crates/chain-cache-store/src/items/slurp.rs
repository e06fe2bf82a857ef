use crate::codec::{CodecError, Decoder, Encoder};
use crate::item::{CacheItem, TimeBasis};
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// Raw response from a block explorer for one address and listing type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlurpItem {
    pub address: Address,
    /// Listing type, e.g. `txlist`, `internal` or `token`.
    pub source: String,
    pub fetched_at: Timestamp,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

impl CacheItem for SlurpItem {
    const KIND: CacheKind = CacheKind::Slurp;
    const VERSION: u16 = 1;

    /// `ttl` is the caller's maximum acceptable age.
    type Basis = TimeBasis;

    fn key(&self) -> CacheKey {
        CacheKey::address_tagged(self.address, self.source.clone())
    }

    fn validate(&self) -> Result<(), String> {
        if self.source.is_empty() {
            return Err(format!("slurp for {} has an empty source", self.address));
        }
        Ok(())
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.source)
            .encode_field(&self.fetched_at)
            .encode_bytes(&self.payload)
            .finish();
    }

    fn decode_payload(payload: &[u8], _version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (source, decoder) = decoder.decode_field("source")?;
        let (fetched_at, decoder) = decoder.decode_field("fetched_at")?;
        let (payload, decoder) = decoder.decode_bytes("payload")?;
        decoder.finish_all()?;
        Ok(Self {
            address,
            source,
            fetched_at,
            payload,
        })
    }

    fn is_stale(&self, basis: &TimeBasis) -> bool {
        basis.expired(self.fetched_at)
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(serde::de::Error::custom)
    }
}
