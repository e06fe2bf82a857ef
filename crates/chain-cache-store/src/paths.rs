//! Path utilities for the sharded cache layout.
//!
//! ```text
//! <cache_root>/<chain>/<kind_dir>/<xx>.bin    shard file
//! <cache_root>/<chain>/<kind_dir>/<xx>.lock   writer lock
//! ```

use crate::error::{CacheError, Result};
use crate::key::CacheKind;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SHARD_EXTENSION: &str = "bin";
pub const LOCK_EXTENSION: &str = "lock";

/// Reject chain names that would not stay one directory below the cache root.
pub fn check_chain_name(chain: &str) -> Result<()> {
    let bad = chain.is_empty()
        || chain == "."
        || chain == ".."
        || chain.contains(['/', '\\', '\0']);
    if bad {
        return Err(CacheError::InvalidKey(format!(
            "'{chain}' is not a usable chain name"
        )));
    }
    Ok(())
}

/// Directory owned by one typed cache.
pub fn kind_dir(cache_root: &Path, chain: &str, kind: CacheKind) -> PathBuf {
    cache_root.join(chain).join(kind.dir_name())
}

/// Shard file for shard byte `shard`.
pub fn shard_path(dir: &Path, shard: u8) -> PathBuf {
    dir.join(format!("{shard:02x}.{SHARD_EXTENSION}"))
}

/// Lock file guarding writes to shard `shard`.
pub fn lock_path(dir: &Path, shard: u8) -> PathBuf {
    dir.join(format!("{shard:02x}.{LOCK_EXTENSION}"))
}

/// Recover the shard byte from a shard file name such as `ab.bin`.
pub fn parse_shard_file_name(name: &str) -> Option<u8> {
    let stem = name.strip_suffix(".bin")?;
    if stem.len() != 2 || stem.chars().any(|c| c.is_ascii_uppercase()) {
        return None;
    }
    u8::from_str_radix(stem, 16).ok()
}

/// Ensure all parent directories exist for a path.
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CacheError::write_failed(parent, e))?;
    }
    Ok(())
}

/// Write a file atomically (write to a per-process temp file, then rename).
///
/// The temp file is synced before the rename so a reader never observes a
/// shard that is shorter than its header claims after a crash.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("shard");
    let tmp_path = path.with_file_name(format!("{file_name}.{}.tmp", std::process::id()));

    let write = || -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()
    };
    if let Err(e) = write() {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(CacheError::write_failed(&tmp_path, e));
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        CacheError::write_failed(path, e)
    })
}
