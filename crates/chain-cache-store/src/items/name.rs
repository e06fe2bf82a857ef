use crate::codec::{CodecError, Decoder, Encoder};
use crate::item::{CacheItem, TimeBasis};
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// Human-readable label for an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameItem {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Colon-separated grouping, e.g. `50-Tokens:ERC20`.
    pub tags: String,
    pub source: String,
    pub is_contract: bool,
    pub is_erc20: bool,
    pub is_erc721: bool,
    pub updated_at: Timestamp,
}

impl CacheItem for NameItem {
    const KIND: CacheKind = CacheKind::Name;
    /// Version 1 predates the `is_erc721` flag.
    const VERSION: u16 = 2;

    /// `ttl == 0` means names never expire and are only replaced explicitly.
    type Basis = TimeBasis;

    fn key(&self) -> CacheKey {
        CacheKey::address(self.address)
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.name)
            .encode_field(&self.symbol)
            .encode_field(&self.decimals)
            .encode_field(&self.tags)
            .encode_field(&self.source)
            .encode_field(&self.is_contract)
            .encode_field(&self.is_erc20)
            .encode_field(&self.is_erc721)
            .encode_field(&self.updated_at)
            .finish();
    }

    fn decode_payload(payload: &[u8], version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (name, decoder) = decoder.decode_field("name")?;
        let (symbol, decoder) = decoder.decode_field("symbol")?;
        let (decimals, decoder) = decoder.decode_field("decimals")?;
        let (tags, decoder) = decoder.decode_field("tags")?;
        let (source, decoder) = decoder.decode_field("source")?;
        let (is_contract, decoder) = decoder.decode_field("is_contract")?;
        let (is_erc20, decoder) = decoder.decode_field("is_erc20")?;
        let (is_erc721, decoder) = if version >= 2 {
            decoder.decode_field("is_erc721")?
        } else {
            (false, decoder)
        };
        let (updated_at, decoder) = decoder.decode_field("updated_at")?;
        decoder.finish_all()?;
        Ok(Self {
            address,
            name,
            symbol,
            decimals,
            tags,
            source,
            is_contract,
            is_erc20,
            is_erc721,
            updated_at,
        })
    }

    fn is_stale(&self, basis: &TimeBasis) -> bool {
        basis.ttl > 0 && basis.expired(self.updated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_versioned;

    fn sample() -> NameItem {
        NameItem {
            address: "0x6b175474e89094c44da98b954eedeac495271d0f".parse().unwrap(),
            name: "Dai Stablecoin".into(),
            symbol: "DAI".into(),
            decimals: 18,
            tags: "50-Tokens:ERC20".into(),
            source: "On chain".into(),
            is_contract: true,
            is_erc20: true,
            is_erc721: false,
            updated_at: 5_000,
        }
    }

    #[test]
    fn test_round_trip() {
        let item = sample();
        assert_eq!(NameItem::decode(&item.encode()).unwrap(), item);
    }

    #[test]
    fn test_reads_version_one_records() {
        let item = sample();
        let bytes = encode_versioned(1, |buf| {
            Encoder::new(buf)
                .encode_field(&item.address)
                .encode_field(&item.name)
                .encode_field(&item.symbol)
                .encode_field(&item.decimals)
                .encode_field(&item.tags)
                .encode_field(&item.source)
                .encode_field(&item.is_contract)
                .encode_field(&item.is_erc20)
                .encode_field(&item.updated_at)
                .finish()
        });
        assert_eq!(NameItem::decode(&bytes).unwrap(), item);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let item = sample();
        assert!(!item.is_stale(&TimeBasis::new(u64::MAX, 0)));
        assert!(!item.is_stale(&TimeBasis::new(5_060, 60)));
        assert!(item.is_stale(&TimeBasis::new(5_061, 60)));
    }

    #[test]
    fn test_newer_version_is_refused() {
        let bytes = encode_versioned(NameItem::VERSION + 1, |buf| sample().encode_payload(buf));
        assert!(matches!(
            NameItem::decode(&bytes),
            Err(CodecError::SchemaMismatch { found: 3, supported: 2 })
        ));
    }
}
