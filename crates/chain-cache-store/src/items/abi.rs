use crate::codec::{CodecError, Decode, Decoder, Encode, Encoder};
use crate::item::CacheItem;
use crate::key::{CacheKey, CacheKind};
use chain_cache_types::{Address, Hash};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiEntryKind {
    Function,
    Event,
    Error,
}

impl AbiEntryKind {
    fn tag(self) -> u8 {
        match self {
            AbiEntryKind::Function => 1,
            AbiEntryKind::Event => 2,
            AbiEntryKind::Error => 3,
        }
    }
}

impl Encode for AbiEntryKind {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.tag().encode(buf);
    }
}

impl Decode for AbiEntryKind {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (tag, rest) = u8::decode_unfinished(buf)?;
        let kind = match tag {
            1 => AbiEntryKind::Function,
            2 => AbiEntryKind::Event,
            3 => AbiEntryKind::Error,
            other => {
                return Err(CodecError::corrupt(format!(
                    "unknown abi entry kind {other}"
                )))
            }
        };
        Ok((kind, rest))
    }
}

/// One function, event or error from a contract interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    pub kind: AbiEntryKind,
    pub name: String,
    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub signature: String,
    /// Four-byte selector for functions and errors, topic hash for events.
    pub selector: String,
}

impl Encode for AbiEntry {
    fn encode(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.kind)
            .encode_field(&self.name)
            .encode_field(&self.signature)
            .encode_field(&self.selector)
            .finish();
    }
}

impl Decode for AbiEntry {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let decoder = Decoder::new(buf)?;
        let (kind, decoder) = decoder.decode_field("kind")?;
        let (name, decoder) = decoder.decode_field("name")?;
        let (signature, decoder) = decoder.decode_field("signature")?;
        let (selector, decoder) = decoder.decode_field("selector")?;
        let rest = decoder.finish()?;
        Ok((
            Self {
                kind,
                name,
                signature,
                selector,
            },
            rest,
        ))
    }
}

/// Decoded interface of a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiItem {
    pub address: Address,
    /// Hash of the code the interface was derived from.
    pub code_hash: Hash,
    pub entries: Vec<AbiEntry>,
}

impl AbiItem {
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AbiEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.name == name)
    }

    pub fn count(&self, kind: AbiEntryKind) -> usize {
        self.entries.iter().filter(|entry| entry.kind == kind).count()
    }
}

/// Content hash of deployed bytecode, suitable as the Abi freshness basis.
pub fn code_hash_of(code: &[u8]) -> Hash {
    Hash::new(Sha256::digest(code).into())
}

impl CacheItem for AbiItem {
    const KIND: CacheKind = CacheKind::Abi;
    const VERSION: u16 = 1;

    /// Hash of the code currently deployed at the address.
    type Basis = Hash;

    fn key(&self) -> CacheKey {
        CacheKey::address(self.address)
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.code_hash)
            .encode_field(&self.entries)
            .finish();
    }

    fn decode_payload(payload: &[u8], _version: u16) -> Result<Self, CodecError> {
        let decoder = Decoder::new(payload)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (code_hash, decoder) = decoder.decode_field("code_hash")?;
        let (entries, decoder) = decoder.decode_field("entries")?;
        decoder.finish_all()?;
        Ok(Self {
            address,
            code_hash,
            entries,
        })
    }

    fn is_stale(&self, current_code_hash: &Hash) -> bool {
        self.code_hash != *current_code_hash
    }
}
