//! Address and hash primitives.
//!
//! This module is the canonical source for address normalization in the workspace.
//! Other crates should import from here rather than defining their own logic.
//!
//! Account addresses are 20-byte values, but they're often represented in different formats:
//! - Short form: "0x1"
//! - Full form: "0x0000000000000000000000000000000000000001"
//! - Without prefix: "1"
//!
//! Everything is normalized to lowercase, `0x`-prefixed, left-padded hex.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a block, transaction or code hash in bytes.
pub const HASH_LENGTH: usize = 32;

/// Error returned when a hex string cannot be parsed into a fixed-width value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseHexError {
    #[error("hex value is empty")]
    Empty,
    #[error("expected at most {max} hex digits, got {got}")]
    TooLong { max: usize, got: usize },
    #[error("invalid hex digit in '{0}'")]
    InvalidDigit(String),
}

fn strip_hex_prefix(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

fn parse_fixed<const N: usize>(value: &str) -> Result<[u8; N], ParseHexError> {
    let digits = strip_hex_prefix(value);
    if digits.is_empty() {
        return Err(ParseHexError::Empty);
    }
    if digits.len() > N * 2 {
        return Err(ParseHexError::TooLong {
            max: N * 2,
            got: digits.len(),
        });
    }
    let padded = format!("{:0>width$}", digits, width = N * 2);
    let mut out = [0u8; N];
    hex::decode_to_slice(&padded, &mut out)
        .map_err(|_| ParseHexError::InvalidDigit(value.trim().to_string()))?;
    Ok(out)
}

macro_rules! fixed_hex_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LENGTH: usize = $len;
            pub const ZERO: Self = Self([0u8; $len]);

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Build from a slice, returning `None` if the length is wrong.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Full-width lowercase hex with `0x` prefix.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed::<$len>(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_hex_type!(
    /// A 20-byte account or contract address.
    Address,
    ADDRESS_LENGTH
);

fixed_hex_type!(
    /// A 32-byte hash (block hash, code hash, chunk hash).
    Hash,
    HASH_LENGTH
);
