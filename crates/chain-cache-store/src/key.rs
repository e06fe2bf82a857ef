//! Cache kinds and keys.
//!
//! A [`CacheKey`] is scoped to one typed cache. Its canonical bytes are the
//! codec encoding of the key (a shape tag followed by the fields), so the same
//! logical object produces identical bytes across runs and platforms.

use crate::codec::{CodecError, Decode, Encode};
use crate::error::{CacheError, Result};
use chain_cache_types::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// The eight kinds of cached object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Chain,
    Abi,
    Collection,
    Monitor,
    Index,
    Price,
    Name,
    Slurp,
}

impl CacheKind {
    pub const ALL: [CacheKind; 8] = [
        CacheKind::Chain,
        CacheKind::Abi,
        CacheKind::Collection,
        CacheKind::Monitor,
        CacheKind::Index,
        CacheKind::Price,
        CacheKind::Name,
        CacheKind::Slurp,
    ];

    /// Numeric tag written into shard headers. Never reuse a retired value.
    pub fn tag(self) -> u8 {
        match self {
            CacheKind::Chain => 1,
            CacheKind::Abi => 2,
            CacheKind::Collection => 3,
            CacheKind::Monitor => 4,
            CacheKind::Index => 5,
            CacheKind::Price => 6,
            CacheKind::Name => 7,
            CacheKind::Slurp => 8,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Directory under `<cache_root>/<chain>/` owned by this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            CacheKind::Chain => "chain",
            CacheKind::Abi => "abis",
            CacheKind::Collection => "collections",
            CacheKind::Monitor => "monitors",
            CacheKind::Index => "index",
            CacheKind::Price => "prices",
            CacheKind::Name => "names",
            CacheKind::Slurp => "slurps",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Chain => "chain",
            CacheKind::Abi => "abi",
            CacheKind::Collection => "collection",
            CacheKind::Monitor => "monitor",
            CacheKind::Index => "index",
            CacheKind::Price => "price",
            CacheKind::Name => "name",
            CacheKind::Slurp => "slurp",
        }
    }

    /// Human hint for the text form of this kind's keys.
    pub fn key_hint(self) -> &'static str {
        match self {
            CacheKind::Chain => "<chain-id>",
            CacheKind::Abi | CacheKind::Collection | CacheKind::Monitor | CacheKind::Name => {
                "<address>"
            }
            CacheKind::Index => "<first>-<last>",
            CacheKind::Price => "<token>:<quote>",
            CacheKind::Slurp => "<address>:<source>",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted || kind.dir_name() == wanted)
            .ok_or_else(|| CacheError::InvalidKey(format!("unknown cache kind '{s}'")))
    }
}

/// Identifier of one record inside a typed cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Address(Address),
    Chain(u64),
    AddressPair(Address, Address),
    BlockRange { first: u64, last: u64 },
    AddressTagged(Address, String),
}

const TAG_ADDRESS: u8 = 1;
const TAG_CHAIN: u8 = 2;
const TAG_PAIR: u8 = 3;
const TAG_RANGE: u8 = 4;
const TAG_TAGGED: u8 = 5;

impl CacheKey {
    pub fn address(address: Address) -> Self {
        Self::Address(address)
    }

    pub fn chain(chain_id: u64) -> Self {
        Self::Chain(chain_id)
    }

    pub fn address_pair(first: Address, second: Address) -> Self {
        Self::AddressPair(first, second)
    }

    pub fn block_range(first: u64, last: u64) -> Self {
        Self::BlockRange { first, last }
    }

    pub fn address_tagged(address: Address, tag: impl Into<String>) -> Self {
        Self::AddressTagged(address, tag.into())
    }

    /// Canonical bytes, used for record ordering and equality on disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    pub fn leading_address(&self) -> Option<&Address> {
        match self {
            Self::Address(address)
            | Self::AddressPair(address, _)
            | Self::AddressTagged(address, _) => Some(address),
            Self::Chain(_) | Self::BlockRange { .. } => None,
        }
    }

    /// Which of the 256 shard files holds this key.
    pub fn shard(&self) -> u8 {
        match self.leading_address() {
            Some(address) => address.as_bytes()[0],
            None => Sha256::digest(self.to_bytes())[0],
        }
    }

    /// Parse the text form a user types for a key of `kind`.
    ///
    /// ```
    /// use chain_cache_store::{CacheKey, CacheKind};
    ///
    /// let key = CacheKey::parse(CacheKind::Index, "100-199").unwrap();
    /// assert_eq!(key, CacheKey::block_range(100, 199));
    /// assert!(CacheKey::parse(CacheKind::Chain, "mainnet").is_err());
    /// ```
    pub fn parse(kind: CacheKind, text: &str) -> Result<Self> {
        let raw = text;
        let text = text.trim();
        let invalid = || {
            CacheError::InvalidKey(format!(
                "'{text}' is not a {kind} key (expected {})",
                kind.key_hint()
            ))
        };
        let address = |s: &str| s.parse::<Address>().map_err(|_| invalid());

        match kind {
            CacheKind::Chain => text.parse().map(Self::Chain).map_err(|_| invalid()),
            CacheKind::Abi | CacheKind::Collection | CacheKind::Monitor | CacheKind::Name => {
                address(text).map(Self::Address)
            }
            CacheKind::Index => {
                let (first, last) = text.split_once('-').ok_or_else(invalid)?;
                let first: u64 = first.trim().parse().map_err(|_| invalid())?;
                let last: u64 = last.trim().parse().map_err(|_| invalid())?;
                if first > last {
                    return Err(invalid());
                }
                Ok(Self::block_range(first, last))
            }
            CacheKind::Price => {
                let (token, quote) = text.split_once(':').ok_or_else(invalid)?;
                Ok(Self::address_pair(address(token)?, address(quote)?))
            }
            CacheKind::Slurp => {
                // Tags are stored verbatim, so only the address side is trimmed.
                let (addr, tag) = raw.split_once(':').ok_or_else(invalid)?;
                if tag.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::address_tagged(address(addr)?, tag))
            }
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(f, "{address}"),
            Self::Chain(id) => write!(f, "{id}"),
            Self::AddressPair(first, second) => write!(f, "{first}:{second}"),
            Self::BlockRange { first, last } => write!(f, "{first}-{last}"),
            Self::AddressTagged(address, tag) => write!(f, "{address}:{tag}"),
        }
    }
}

impl Encode for CacheKey {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Address(address) => {
                TAG_ADDRESS.encode(buf);
                address.encode(buf);
            }
            Self::Chain(id) => {
                TAG_CHAIN.encode(buf);
                id.encode(buf);
            }
            Self::AddressPair(first, second) => {
                TAG_PAIR.encode(buf);
                first.encode(buf);
                second.encode(buf);
            }
            Self::BlockRange { first, last } => {
                TAG_RANGE.encode(buf);
                first.encode(buf);
                last.encode(buf);
            }
            Self::AddressTagged(address, tag) => {
                TAG_TAGGED.encode(buf);
                address.encode(buf);
                tag.encode(buf);
            }
        }
    }
}

impl Decode for CacheKey {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (tag, rest) = u8::decode_unfinished(buf)?;
        match tag {
            TAG_ADDRESS => {
                let (address, rest) = Address::decode_unfinished(rest)?;
                Ok((Self::Address(address), rest))
            }
            TAG_CHAIN => {
                let (id, rest) = u64::decode_unfinished(rest)?;
                Ok((Self::Chain(id), rest))
            }
            TAG_PAIR => {
                let (first, rest) = Address::decode_unfinished(rest)?;
                let (second, rest) = Address::decode_unfinished(rest)?;
                Ok((Self::AddressPair(first, second), rest))
            }
            TAG_RANGE => {
                let (first, rest) = u64::decode_unfinished(rest)?;
                let (last, rest) = u64::decode_unfinished(rest)?;
                Ok((Self::BlockRange { first, last }, rest))
            }
            TAG_TAGGED => {
                let (address, rest) = Address::decode_unfinished(rest)?;
                let (tag, rest) = String::decode_unfinished(rest)?;
                Ok((Self::AddressTagged(address, tag), rest))
            }
            other => Err(CodecError::corrupt(format!("unknown key tag {other}"))),
        }
    }
}
