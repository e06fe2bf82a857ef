use crate::codec::{CodecError, Decoder, Encoder};
use crate::item::{CacheItem, TimeBasis};
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::{Address, BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};

/// Price of `token` denominated in `quote`, as of `block`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceItem {
    pub token: Address,
    pub quote: Address,
    pub block: BlockNumber,
    pub price: f64,
    pub timestamp: Timestamp,
    /// Where the quote came from, e.g. `uniswap` or `maker`.
    pub source: String,
}

impl CacheItem for PriceItem {
    const KIND: CacheKind = CacheKind::Price;
    const VERSION: u16 = 1;

    type Basis = TimeBasis;

    fn key(&self) -> CacheKey {
        CacheKey::address_pair(self.token, self.quote)
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.token)
            .encode_field(&self.quote)
            .encode_field(&self.block)
            .encode_field(&self.price)
            .encode_field(&self.timestamp)
            .encode_field(&self.source)
            .finish();
    }

    fn decode_payload(payload: &[u8], _version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (token, decoder) = decoder.decode_field("token")?;
        let (quote, decoder) = decoder.decode_field("quote")?;
        let (block, decoder) = decoder.decode_field("block")?;
        let (price, decoder) = decoder.decode_field("price")?;
        let (timestamp, decoder) = decoder.decode_field("timestamp")?;
        let (source, decoder) = decoder.decode_field("source")?;
        decoder.finish_all()?;
        Ok(Self {
            token,
            quote,
            block,
            price,
            timestamp,
            source,
        })
    }

    fn is_stale(&self, basis: &TimeBasis) -> bool {
        basis.expired(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(price: f64) -> PriceItem {
        PriceItem {
            token: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".parse().unwrap(),
            quote: "0x6b175474e89094c44da98b954eedeac495271d0f".parse().unwrap(),
            block: 19_000_000,
            price,
            timestamp: 1_000,
            source: "uniswap".into(),
        }
    }

    #[test]
    fn test_ttl_boundary() {
        let item = sample(2_345.67);
        assert!(!item.is_stale(&TimeBasis::new(1_000, 300)));
        assert!(!item.is_stale(&TimeBasis::new(1_300, 300)));
        assert!(item.is_stale(&TimeBasis::new(1_301, 300)));
    }

    proptest! {
        #[test]
        fn prop_price_bits_survive(price in any::<f64>()) {
            let item = sample(price);
            let decoded = PriceItem::decode(&item.encode()).unwrap();
            prop_assert_eq!(decoded.price.to_bits(), price.to_bits());
        }
    }
}
