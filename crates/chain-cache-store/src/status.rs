//! On-disk status of the caches for one chain.
//!
//! The scan reads shard headers only, so it stays cheap on large caches and
//! never takes a writer lock.

use crate::error::Result;
use crate::key::CacheKind;
use crate::lock::is_locked;
use crate::paths::{check_chain_name, kind_dir, parse_shard_file_name, LOCK_EXTENSION};
use crate::store::read_header;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Status of one typed cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindStatus {
    pub kind: CacheKind,
    pub path: PathBuf,
    pub exists: bool,
    pub shard_files: u64,
    /// Sum of header record counts over readable shards
    pub records: u64,
    pub bytes: u64,
    /// Shards whose header is missing, foreign, or from another format version
    pub unreadable: u64,
    /// Live writer locks
    pub locked: u64,
    /// Temp files left behind by interrupted writers
    pub temp_files: u64,
}

impl KindStatus {
    fn empty(kind: CacheKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            exists: false,
            shard_files: 0,
            records: 0,
            bytes: 0,
            unreadable: 0,
            locked: 0,
            temp_files: 0,
        }
    }

    fn scan(
        cache_root: &Path,
        chain: &str,
        kind: CacheKind,
        stale_lock_after: Duration,
    ) -> Result<Self> {
        let dir = kind_dir(cache_root, chain, kind);
        let mut status = Self::empty(kind, dir.clone());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(status),
            Err(e) => return Err(e.into()),
        };
        status.exists = true;

        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if parse_shard_file_name(&name).is_some() {
                status.shard_files += 1;
                status.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                let header = read_header(&path).and_then(|header| {
                    header.validate(kind)?;
                    Ok(header)
                });
                match header {
                    Ok(header) => status.records += u64::from(header.record_count),
                    Err(e) => {
                        warn!(shard = %path.display(), error = %e, "unreadable shard header");
                        status.unreadable += 1;
                    }
                }
            } else if name.ends_with(&format!(".{LOCK_EXTENSION}")) {
                if is_locked(&path, stale_lock_after) {
                    status.locked += 1;
                }
            } else if name.ends_with(".tmp") {
                status.temp_files += 1;
            }
        }
        Ok(status)
    }
}

/// Status of every requested kind, plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub cache_root: PathBuf,
    pub chain: String,
    pub kinds: Vec<KindStatus>,
    pub total_records: u64,
    pub total_bytes: u64,
    pub total_unreadable: u64,
}

impl CacheStatus {
    /// Scan all eight kinds.
    pub fn scan(cache_root: &Path, chain: &str, stale_lock_after: Duration) -> Result<Self> {
        Self::scan_kinds(cache_root, chain, &CacheKind::ALL, stale_lock_after)
    }

    pub fn scan_kinds(
        cache_root: &Path,
        chain: &str,
        kinds: &[CacheKind],
        stale_lock_after: Duration,
    ) -> Result<Self> {
        check_chain_name(chain)?;
        let kinds = kinds
            .iter()
            .map(|kind| KindStatus::scan(cache_root, chain, *kind, stale_lock_after))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            cache_root: cache_root.to_path_buf(),
            chain: chain.to_string(),
            total_records: kinds.iter().map(|k| k.records).sum(),
            total_bytes: kinds.iter().map(|k| k.bytes).sum(),
            total_unreadable: kinds.iter().map(|k| k.unreadable).sum(),
            kinds,
        })
    }

    pub fn kind(&self, kind: CacheKind) -> Option<&KindStatus> {
        self.kinds.iter().find(|status| status.kind == kind)
    }

    /// Format a human-readable table.
    pub fn format_status(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Cache Status: {} ({})", self.chain, self.cache_root.display()));
        lines.push("=".repeat(60));
        lines.push(format!(
            "  {:<12} {:>8} {:>10} {:>12} {:>10}",
            "kind", "shards", "records", "bytes", "unreadable"
        ));
        for status in &self.kinds {
            let mut line = format!(
                "  {:<12} {:>8} {:>10} {:>12} {:>10}",
                status.kind.as_str(),
                status.shard_files,
                status.records,
                status.bytes,
                status.unreadable
            );
            if !status.exists {
                line.push_str("  (empty)");
            } else if status.locked > 0 {
                line.push_str(&format!("  ({} locked)", status.locked));
            }
            lines.push(line);
        }
        lines.push("-".repeat(60));
        lines.push(format!(
            "  {:<12} {:>8} {:>10} {:>12} {:>10}",
            "total",
            self.kinds.iter().map(|k| k.shard_files).sum::<u64>(),
            self.total_records,
            self.total_bytes,
            self.total_unreadable
        ));
        lines.join("\n")
    }
}
