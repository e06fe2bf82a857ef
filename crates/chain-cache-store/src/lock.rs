//! Cross-process writer locks for shard files.
//!
//! A lock is a `<shard>.lock` file created with `create_new` (O_EXCL), so only
//! one process can hold it. The file records who holds it. A lock older than
//! the stale threshold is assumed to belong to a crashed writer and is broken.
//!
//! Breaking a stale lock is remove-then-create, so two waiters that both judge
//! the same lock stale can race. The window is the gap between the token
//! re-check and the remove, and only opens after a writer has already crashed.

use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Default time a writer waits for a busy shard.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default age after which a lock is considered abandoned.
pub const DEFAULT_STALE_LOCK: Duration = Duration::from_secs(3600);

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub holder_pid: u32,
    pub holder_hostname: String,
    /// Unique per acquisition, so a process never releases a lock it lost.
    pub token: String,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn new() -> Self {
        Self {
            holder_pid: std::process::id(),
            holder_hostname: hostname(),
            token: uuid::Uuid::new_v4().to_string(),
            acquired_at: Utc::now(),
        }
    }

    fn describe(&self) -> String {
        format!("pid {} on {}", self.holder_pid, self.holder_hostname)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub timeout: Duration,
    pub stale_after: Duration,
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCK_TIMEOUT,
            stale_after: DEFAULT_STALE_LOCK,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Held writer lock. Released when dropped, including during unwinding.
#[derive(Debug)]
pub struct ShardLock {
    path: PathBuf,
    token: String,
}

impl ShardLock {
    /// Acquire the lock at `path`, polling until `options.timeout` elapses.
    pub fn acquire(path: &Path, options: &LockOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let started = Instant::now();
        loop {
            let info = LockInfo::new();
            if try_create(path, &info)? {
                debug!(lock = %path.display(), "acquired shard lock");
                return Ok(Self {
                    path: path.to_path_buf(),
                    token: info.token,
                });
            }

            if break_if_abandoned(path, options.stale_after)? {
                continue;
            }

            let waited = started.elapsed();
            if waited >= options.timeout {
                let holder = read_lock(path)
                    .map(|info| info.describe())
                    .unwrap_or_else(|_| "unknown holder".to_string());
                return Err(CacheError::LockTimeout {
                    path: path.to_path_buf(),
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    holder,
                });
            }
            std::thread::sleep(options.poll_interval);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for ShardLock {
    fn drop(&mut self) {
        if let Err(e) = release_lock_if_owned(&self.path, &self.token) {
            warn!(lock = %self.path.display(), error = %e, "failed to release shard lock");
        }
    }
}

fn try_create(path: &Path, info: &LockInfo) -> Result<bool> {
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(mut file) => {
            file.write_all(serde_json::to_string(info)?.as_bytes())?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove the lock at `path` if it is older than `stale_after`.
///
/// Age comes from the recorded acquisition time, or the file's mtime when the
/// contents are unreadable (a writer may have crashed between create and write).
fn break_if_abandoned(path: &Path, stale_after: Duration) -> Result<bool> {
    let existing = read_lock(path).ok();
    let age = match &existing {
        Some(info) => Utc::now()
            .signed_duration_since(info.acquired_at)
            .to_std()
            .unwrap_or(Duration::ZERO),
        None => match file_age(path) {
            Some(age) => age,
            // Released between our create attempt and now.
            None => return Ok(true),
        },
    };
    if age < stale_after {
        return Ok(false);
    }

    // Only remove the exact lock we judged stale.
    if read_lock(path).ok() != existing {
        return Ok(true);
    }
    warn!(
        lock = %path.display(),
        holder = %existing.as_ref().map(LockInfo::describe).unwrap_or_default(),
        age_secs = age.as_secs(),
        "breaking abandoned shard lock"
    );
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

/// Release a lock only if it still carries `token`.
pub fn release_lock_if_owned(path: &Path, token: &str) -> Result<()> {
    let info = match read_lock(path) {
        Ok(info) => info,
        Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        // Unreadable metadata: not provably ours, leave it alone.
        Err(_) => return Ok(()),
    };
    if info.token == token {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read lock info from a lock file.
pub fn read_lock(path: &Path) -> Result<LockInfo> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Whether a live (non-stale) lock exists at `path`.
pub fn is_locked(path: &Path, stale_after: Duration) -> bool {
    match read_lock(path) {
        Ok(info) => Utc::now()
            .signed_duration_since(info.acquired_at)
            .to_std()
            .map(|age| age < stale_after)
            .unwrap_or(true),
        Err(_) => false,
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "unknown".to_string())
}
