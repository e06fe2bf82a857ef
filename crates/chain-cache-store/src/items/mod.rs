//! The eight cached object types.

mod abi;
mod chain;
mod collection;
mod index;
mod monitor;
mod name;
mod price;
mod slurp;

pub use abi::{code_hash_of, AbiEntry, AbiEntryKind, AbiItem};
pub use chain::ChainItem;
pub use collection::CollectionItem;
pub use index::IndexItem;
pub use monitor::{MonitorItem, MonitorState};
pub use name::NameItem;
pub use price::PriceItem;
pub use slurp::SlurpItem;

use crate::codec::CodecError;
use crate::item::CacheItem;
use crate::key::{CacheKey, CacheKind};
use serde::Serialize;

/// Any cached item, for tooling that handles records without knowing their type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "lowercase")]
pub enum AnyItem {
    Chain(ChainItem),
    Abi(AbiItem),
    Collection(CollectionItem),
    Monitor(MonitorItem),
    Index(IndexItem),
    Price(PriceItem),
    Name(NameItem),
    Slurp(SlurpItem),
}

impl AnyItem {
    /// Decode a stored payload of the given kind.
    pub fn decode(kind: CacheKind, bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(match kind {
            CacheKind::Chain => Self::Chain(ChainItem::decode(bytes)?),
            CacheKind::Abi => Self::Abi(AbiItem::decode(bytes)?),
            CacheKind::Collection => Self::Collection(CollectionItem::decode(bytes)?),
            CacheKind::Monitor => Self::Monitor(MonitorItem::decode(bytes)?),
            CacheKind::Index => Self::Index(IndexItem::decode(bytes)?),
            CacheKind::Price => Self::Price(PriceItem::decode(bytes)?),
            CacheKind::Name => Self::Name(NameItem::decode(bytes)?),
            CacheKind::Slurp => Self::Slurp(SlurpItem::decode(bytes)?),
        })
    }

    pub fn kind(&self) -> CacheKind {
        match self {
            Self::Chain(_) => CacheKind::Chain,
            Self::Abi(_) => CacheKind::Abi,
            Self::Collection(_) => CacheKind::Collection,
            Self::Monitor(_) => CacheKind::Monitor,
            Self::Index(_) => CacheKind::Index,
            Self::Price(_) => CacheKind::Price,
            Self::Name(_) => CacheKind::Name,
            Self::Slurp(_) => CacheKind::Slurp,
        }
    }

    pub fn key(&self) -> CacheKey {
        match self {
            Self::Chain(item) => item.key(),
            Self::Abi(item) => item.key(),
            Self::Collection(item) => item.key(),
            Self::Monitor(item) => item.key(),
            Self::Index(item) => item.key(),
            Self::Price(item) => item.key(),
            Self::Name(item) => item.key(),
            Self::Slurp(item) => item.key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_dispatches_on_kind() {
        let item = IndexItem {
            first_block: 1,
            last_block: 2,
            appearance_count: 3,
            address_count: 4,
            chunk_hash: Default::default(),
            ipfs_cid: "cid".into(),
        };
        let any = AnyItem::decode(CacheKind::Index, &item.encode()).unwrap();
        assert_eq!(any.kind(), CacheKind::Index);
        assert_eq!(any.key(), CacheKey::block_range(1, 2));
        assert_eq!(any, AnyItem::Index(item.clone()));

        // Bytes of one kind are not silently accepted as another.
        assert!(AnyItem::decode(CacheKind::Chain, &item.encode()).is_err());
    }

    #[test]
    fn test_json_is_tagged() {
        let item = SlurpItem {
            address: "0x1".parse().unwrap(),
            source: "token".into(),
            fetched_at: 1,
            payload: vec![],
        };
        let json = serde_json::to_value(AnyItem::Slurp(item)).unwrap();
        assert_eq!(json["kind"], "slurp");
        assert_eq!(json["item"]["source"], "token");
    }
}
