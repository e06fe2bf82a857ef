//! Shared types for the chain-cache workspace.
//!
//! This crate provides the primitives every other crate in the workspace
//! agrees on: fixed-width [`Address`] and [`Hash`] values with canonical text
//! forms, block/time aliases, and environment parsing helpers.

pub mod address;
pub mod env_utils;

pub use address::{Address, Hash, ParseHexError, ADDRESS_LENGTH, HASH_LENGTH};

/// Block height.
pub type BlockNumber = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Current wall-clock time as a Unix timestamp in seconds.
pub fn unix_now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
