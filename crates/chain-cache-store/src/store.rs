//! Sharded on-disk record store shared by every typed cache.
//!
//! Each typed cache owns one directory holding up to 256 shard files. A shard
//! file is a [`CacheHeader`] followed by `record_count` records, each a
//! length-prefixed key and a length-prefixed payload, sorted by key bytes.
//!
//! Writes rewrite the whole shard under both an in-process `RwLock` and the
//! shard's lock file, then publish it with an atomic rename. Readers only take
//! the in-process lock; the rename guarantees they see a complete file.

use crate::codec::{check_field_len, decode_bytes, encode_bytes, CodecError, Decode, Encode};
use crate::error::{CacheError, Result};
use crate::key::{CacheKey, CacheKind};
use crate::lock::{LockOptions, ShardLock};
use crate::paths::{atomic_write, lock_path, parse_shard_file_name, shard_path};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Leading bytes of every shard file.
pub const MAGIC: [u8; 8] = *b"CHCACHE\0";

/// Shard file layout version written by this build.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed header: magic, version, kind tag, record count.
pub const HEADER_LEN: usize = 8 + 2 + 1 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHeader {
    pub format_version: u16,
    pub kind_tag: u8,
    pub record_count: u32,
}

impl CacheHeader {
    pub fn new(kind: CacheKind, record_count: u32) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            kind_tag: kind.tag(),
            record_count,
        }
    }

    pub fn kind(&self) -> Option<CacheKind> {
        CacheKind::from_tag(self.kind_tag)
    }

    /// Check that this header belongs to a `kind` shard this build can read.
    ///
    /// Older layouts and foreign kinds are `Corrupt` so callers rebuild them;
    /// a newer layout is `SchemaMismatch` and must not be overwritten.
    pub fn validate(&self, kind: CacheKind) -> Result<(), CodecError> {
        if self.format_version > FORMAT_VERSION {
            return Err(CodecError::SchemaMismatch {
                found: self.format_version,
                supported: FORMAT_VERSION,
            });
        }
        if self.format_version < FORMAT_VERSION {
            return Err(CodecError::corrupt(format!(
                "shard format version {} predates {}",
                self.format_version, FORMAT_VERSION
            )));
        }
        if self.kind_tag != kind.tag() {
            return Err(CodecError::corrupt(format!(
                "shard holds kind tag {}, expected {} ({kind})",
                self.kind_tag,
                kind.tag()
            )));
        }
        Ok(())
    }
}

impl Encode for CacheHeader {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&MAGIC);
        self.format_version.encode(buf);
        self.kind_tag.encode(buf);
        self.record_count.encode(buf);
    }
}

impl Decode for CacheHeader {
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        if buf.len() < MAGIC.len() || buf[..MAGIC.len()] != MAGIC {
            return Err(CodecError::corrupt("bad magic"));
        }
        let rest = &buf[MAGIC.len()..];
        let (format_version, rest) = u16::decode_unfinished(rest)?;
        let (kind_tag, rest) = u8::decode_unfinished(rest)?;
        let (record_count, rest) = u32::decode_unfinished(rest)?;
        Ok((
            Self {
                format_version,
                kind_tag,
                record_count,
            },
            rest,
        ))
    }
}

/// Read only the header of a shard file.
pub fn read_header(path: &Path) -> Result<CacheHeader> {
    use std::io::Read;

    let mut buf = [0u8; HEADER_LEN];
    let mut file = std::fs::File::open(path)?;
    file.read_exact(&mut buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => CacheError::Corrupt("short header".into()),
        _ => e.into(),
    })?;
    let (header, _) = CacheHeader::decode_unfinished(&buf)?;
    Ok(header)
}

/// Decoded contents of one shard file.
#[derive(Debug, Default)]
struct Shard {
    records: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Part of the file could not be parsed and was dropped.
    damaged: bool,
}

impl Shard {
    fn parse(bytes: &[u8], kind: CacheKind) -> Result<Self, CodecError> {
        let (header, mut rest) = CacheHeader::decode_unfinished(bytes)?;
        header.validate(kind)?;

        let mut shard = Shard::default();
        let mut previous: Option<Vec<u8>> = None;
        for _ in 0..header.record_count {
            let Ok((key, after_key)) = decode_bytes(rest) else {
                shard.damaged = true;
                break;
            };
            let Ok((payload, after_payload)) = decode_bytes(after_key) else {
                shard.damaged = true;
                break;
            };
            if previous.as_deref().is_some_and(|prev| prev >= key) {
                shard.damaged = true;
                break;
            }
            previous = Some(key.to_vec());
            shard.records.insert(key.to_vec(), payload.to_vec());
            rest = after_payload;
        }
        if !shard.damaged && !rest.is_empty() {
            shard.damaged = true;
        }
        Ok(shard)
    }

    fn to_bytes(&self, kind: CacheKind) -> Vec<u8> {
        let mut buf = Vec::new();
        CacheHeader::new(kind, self.records.len() as u32).encode(&mut buf);
        for (key, payload) in &self.records {
            encode_bytes(key, &mut buf);
            encode_bytes(payload, &mut buf);
        }
        buf
    }
}

/// Result of [`CacheStore::write_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Replaced,
    /// Stored bytes were already identical; the file was not rewritten.
    Unchanged,
}

impl WriteOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, WriteOutcome::Unchanged)
    }
}

/// Untyped record store for one cache directory.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    kind: CacheKind,
    mode: OpenMode,
    lock_options: LockOptions,
    shard_locks: Mutex<HashMap<u8, Arc<RwLock<()>>>>,
}

impl CacheStore {
    /// Open the store rooted at `dir`.
    ///
    /// Read-write opens create the directory. Read-only opens require it to
    /// exist and fail with [`CacheError::NotFound`] otherwise.
    pub fn open(
        dir: impl Into<PathBuf>,
        kind: CacheKind,
        mode: OpenMode,
        lock_options: LockOptions,
    ) -> Result<Self> {
        let dir = dir.into();
        match mode {
            OpenMode::ReadWrite => std::fs::create_dir_all(&dir)
                .map_err(|e| CacheError::write_failed(&dir, e))?,
            OpenMode::ReadOnly => {
                if !dir.is_dir() {
                    return Err(CacheError::NotFound(dir));
                }
            }
        }
        debug!(dir = %dir.display(), %kind, ?mode, "opened cache store");
        Ok(Self {
            dir,
            kind,
            mode,
            lock_options,
            shard_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn lock_options(&self) -> &LockOptions {
        &self.lock_options
    }

    /// Stored payload for `key`, uninterpreted.
    pub fn read_raw(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let shard = key.shard();
        let guard = self.shard_guard(shard);
        let _read = guard.read();
        let mut contents = self.load_shard(&shard_path(&self.dir, shard))?;
        Ok(contents.records.remove(&key.to_bytes()))
    }

    /// Store `payload` under `key`, replacing any previous record.
    pub fn write_raw(&self, key: &CacheKey, payload: &[u8]) -> Result<WriteOutcome> {
        let key_bytes = key.to_bytes();
        check_record(&key_bytes, payload)?;
        let outcome = self.modify_shard(key.shard(), |records| {
            match records.insert(key_bytes, payload.to_vec()) {
                None => (WriteOutcome::Inserted, true),
                Some(old) if old == payload => (WriteOutcome::Unchanged, false),
                Some(_) => (WriteOutcome::Replaced, true),
            }
        })?;
        debug!(kind = %self.kind, %key, ?outcome, "wrote cache record");
        Ok(outcome)
    }

    /// Replace the record for `key` with whatever `apply` derives from it.
    ///
    /// `apply` sees the current payload (if any) and runs while the shard's
    /// writer lock is held, so the change is atomic across processes. Returning
    /// `None` leaves the record untouched and yields `Ok(None)`.
    pub fn update_raw(
        &self,
        key: &CacheKey,
        apply: impl FnOnce(Option<&[u8]>) -> Option<Vec<u8>>,
    ) -> Result<Option<WriteOutcome>> {
        let key_bytes = key.to_bytes();
        check_record(&key_bytes, &[])?;
        self.modify_shard(key.shard(), |records| {
            let previous = records.get(&key_bytes).cloned();
            let Some(next) = apply(previous.as_deref()) else {
                return (Ok(None), false);
            };
            if let Err(e) = check_record(&key_bytes, &next) {
                return (Err(e), false);
            }
            let outcome = match previous {
                None => WriteOutcome::Inserted,
                Some(old) if old == next => WriteOutcome::Unchanged,
                Some(_) => WriteOutcome::Replaced,
            };
            records.insert(key_bytes, next);
            (Ok(Some(outcome)), outcome.changed())
        })?
    }

    /// Drop the record for `key`. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        let key_bytes = key.to_bytes();
        let removed = self.modify_shard(key.shard(), |records| {
            let removed = records.remove(&key_bytes).is_some();
            (removed, removed)
        })?;
        debug!(kind = %self.kind, %key, removed, "invalidated cache record");
        Ok(removed)
    }

    /// Drop the record for `key` only while it still holds `expected`.
    ///
    /// Returns whether it was removed. A record rewritten since `expected` was
    /// read is left alone.
    pub fn invalidate_if(&self, key: &CacheKey, expected: &[u8]) -> Result<bool> {
        let key_bytes = key.to_bytes();
        let removed = self.modify_shard(key.shard(), |records| {
            if records.get(&key_bytes).map(Vec::as_slice) != Some(expected) {
                return (false, false);
            }
            records.remove(&key_bytes);
            (true, true)
        })?;
        debug!(kind = %self.kind, %key, removed, "conditionally invalidated cache record");
        Ok(removed)
    }

    /// Drop every record. Returns how many were removed.
    pub fn invalidate_all(&self) -> Result<usize> {
        let mut removed = 0;
        for shard in self.shard_ids()? {
            removed += self.modify_shard(shard, |records| {
                let count = records.len();
                records.clear();
                (count, count > 0)
            })?;
        }
        debug!(kind = %self.kind, removed, "cleared cache");
        Ok(removed)
    }

    /// Shard bytes that currently have a file on disk, ascending.
    pub fn shard_ids(&self) -> Result<Vec<u8>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids: Vec<u8> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_shard_file_name(&entry.file_name().to_string_lossy()))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Every readable record, in shard then key order.
    pub fn records(&self) -> Result<Vec<(CacheKey, Vec<u8>)>> {
        let mut out = Vec::new();
        for shard in self.shard_ids()? {
            let guard = self.shard_guard(shard);
            let _read = guard.read();
            let contents = self.load_shard(&shard_path(&self.dir, shard))?;
            for (key_bytes, payload) in contents.records {
                match CacheKey::decode(&key_bytes) {
                    Ok(key) => out.push((key, payload)),
                    Err(e) => warn!(
                        kind = %self.kind,
                        shard = %format!("{shard:02x}"),
                        error = %e,
                        "skipping record with undecodable key"
                    ),
                }
            }
        }
        Ok(out)
    }

    fn ensure_writable(&self) -> Result<()> {
        match self.mode {
            OpenMode::ReadWrite => Ok(()),
            OpenMode::ReadOnly => Err(CacheError::ReadOnly),
        }
    }

    fn shard_guard(&self, shard: u8) -> Arc<RwLock<()>> {
        self.shard_locks
            .lock()
            .entry(shard)
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Read a shard file, treating missing and unusable files as empty.
    fn load_shard(&self, path: &Path) -> Result<Shard> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Shard::default()),
            Err(e) => return Err(e.into()),
        };
        match Shard::parse(&bytes, self.kind) {
            Ok(shard) => {
                if shard.damaged {
                    warn!(
                        shard = %path.display(),
                        kept = shard.records.len(),
                        "shard file is damaged, dropping unreadable tail"
                    );
                }
                Ok(shard)
            }
            Err(CodecError::Corrupt(reason)) => {
                warn!(shard = %path.display(), %reason, "ignoring unreadable shard file");
                Ok(Shard {
                    records: BTreeMap::new(),
                    damaged: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read-modify-write one shard under both locks.
    ///
    /// `apply` returns its result and whether it changed the records. The file
    /// is rewritten when records changed or the file needed repair, and removed
    /// once the shard is empty.
    fn modify_shard<R>(
        &self,
        shard: u8,
        apply: impl FnOnce(&mut BTreeMap<Vec<u8>, Vec<u8>>) -> (R, bool),
    ) -> Result<R> {
        self.ensure_writable()?;
        let guard = self.shard_guard(shard);
        let _write = guard.write();
        let _lock = ShardLock::acquire(&lock_path(&self.dir, shard), &self.lock_options)?;

        let path = shard_path(&self.dir, shard);
        let mut contents = self.load_shard(&path)?;
        let (result, dirty) = apply(&mut contents.records);

        if contents.records.is_empty() {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::write_failed(&path, e)),
            }
        } else if dirty || contents.damaged {
            atomic_write(&path, &contents.to_bytes(self.kind))?;
        }
        Ok(result)
    }
}

/// Reject records whose key or payload would not decode back.
fn check_record(key_bytes: &[u8], payload: &[u8]) -> Result<()> {
    check_field_len("key", key_bytes.len())
        .and_then(|()| check_field_len("payload", payload.len()))
        .map_err(|e| CacheError::InvalidItem(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_cache_types::Address;
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(s: &str) -> CacheKey {
        CacheKey::address(s.parse::<Address>().unwrap())
    }

    fn open(tmp: &TempDir) -> Result<CacheStore> {
        CacheStore::open(
            tmp.path().join("abis"),
            CacheKind::Abi,
            OpenMode::ReadWrite,
            LockOptions {
                timeout: Duration::from_millis(200),
                ..LockOptions::default()
            },
        )
    }

    #[test]
    fn test_read_only_open_requires_directory() {
        let tmp = TempDir::new().unwrap();
        let err = CacheStore::open(
            tmp.path().join("missing"),
            CacheKind::Abi,
            OpenMode::ReadOnly,
            LockOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_write_read_and_outcomes() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let k = key("0xab01");

        assert_eq!(store.read_raw(&k)?, None);
        assert_eq!(store.write_raw(&k, b"one")?, WriteOutcome::Inserted);
        assert_eq!(store.write_raw(&k, b"one")?, WriteOutcome::Unchanged);
        assert_eq!(store.write_raw(&k, b"two")?, WriteOutcome::Replaced);
        assert_eq!(store.read_raw(&k)?, Some(b"two".to_vec()));
        assert!(!lock_path(store.dir(), k.shard()).exists());
        Ok(())
    }

    #[test]
    fn test_read_only_store_rejects_writes() -> Result<()> {
        let tmp = TempDir::new()?;
        let writer = open(&tmp)?;
        writer.write_raw(&key("0x1"), b"x")?;

        let reader = CacheStore::open(
            writer.dir(),
            CacheKind::Abi,
            OpenMode::ReadOnly,
            LockOptions::default(),
        )?;
        assert_eq!(reader.read_raw(&key("0x1"))?, Some(b"x".to_vec()));
        assert!(matches!(
            reader.write_raw(&key("0x1"), b"y"),
            Err(CacheError::ReadOnly)
        ));
        Ok(())
    }

    #[test]
    fn test_records_sorted_within_shard() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        // Same leading byte, so same shard file.
        let a = key("0x0500000000000000000000000000000000000002");
        let b = key("0x0500000000000000000000000000000000000001");
        store.write_raw(&a, b"a")?;
        store.write_raw(&b, b"b")?;

        let keys: Vec<_> = store.records()?.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b, a]);
        assert_eq!(store.shard_ids()?, vec![0x05]);

        let header = read_header(&shard_path(store.dir(), 0x05))?;
        assert_eq!(header, CacheHeader::new(CacheKind::Abi, 2));
        Ok(())
    }

    #[test]
    fn test_identical_contents_give_identical_files() -> Result<()> {
        let first = TempDir::new()?;
        let second = TempDir::new()?;
        let (s1, s2) = (open(&first)?, open(&second)?);
        let (a, b) = (key("0x0701"), key("0x0702"));
        s1.write_raw(&a, b"a")?;
        s1.write_raw(&b, b"b")?;
        s2.write_raw(&b, b"b")?;
        s2.write_raw(&a, b"a")?;
        assert_eq!(
            std::fs::read(shard_path(s1.dir(), a.shard()))?,
            std::fs::read(shard_path(s2.dir(), a.shard()))?
        );
        Ok(())
    }

    #[test]
    fn test_invalidate_removes_empty_shard_file() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let k = key("0x1");
        store.write_raw(&k, b"x")?;
        assert!(store.invalidate(&k)?);
        assert!(!store.invalidate(&k)?);
        assert!(store.shard_ids()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalidate_all() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        for k in ["0x01", "0x02", "0xff00000000000000000000000000000000000000"] {
            store.write_raw(&key(k), b"x")?;
        }
        assert_eq!(store.invalidate_all()?, 3);
        assert!(store.records()?.is_empty());
        assert_eq!(store.invalidate_all()?, 0);
        Ok(())
    }

    #[test]
    fn test_truncated_tail_keeps_prefix() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let first = key("0x0900000000000000000000000000000000000001");
        let last = key("0x0900000000000000000000000000000000000002");
        store.write_raw(&first, b"first")?;
        store.write_raw(&last, b"last")?;

        let path = shard_path(store.dir(), 0x09);
        let bytes = std::fs::read(&path)?;
        std::fs::write(&path, &bytes[..bytes.len() - 2])?;

        assert_eq!(store.read_raw(&first)?, Some(b"first".to_vec()));
        assert_eq!(store.read_raw(&last)?, None);

        // The next write repairs the file.
        store.write_raw(&last, b"again")?;
        assert_eq!(read_header(&path)?.record_count, 2);
        Ok(())
    }

    #[test]
    fn test_foreign_or_old_shard_is_absent() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let k = key("0x1");
        store.write_raw(&k, b"x")?;
        let path = shard_path(store.dir(), k.shard());

        let mut bytes = std::fs::read(&path)?;
        bytes[10] = CacheKind::Name.tag();
        std::fs::write(&path, &bytes)?;
        assert_eq!(store.read_raw(&k)?, None);

        let mut old = Vec::new();
        CacheHeader {
            format_version: 0,
            ..CacheHeader::new(CacheKind::Abi, 0)
        }
        .encode(&mut old);
        std::fs::write(&path, &old)?;
        assert_eq!(store.read_raw(&k)?, None);

        std::fs::write(&path, b"garbage")?;
        assert_eq!(store.read_raw(&k)?, None);
        store.write_raw(&k, b"rebuilt")?;
        assert_eq!(store.read_raw(&k)?, Some(b"rebuilt".to_vec()));
        Ok(())
    }

    #[test]
    fn test_newer_format_is_schema_mismatch() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let k = key("0x1");
        let mut bytes = Vec::new();
        CacheHeader {
            format_version: FORMAT_VERSION + 1,
            ..CacheHeader::new(CacheKind::Abi, 0)
        }
        .encode(&mut bytes);
        std::fs::write(shard_path(store.dir(), k.shard()), &bytes)?;

        assert!(matches!(
            store.read_raw(&k),
            Err(CacheError::SchemaMismatch { .. })
        ));
        assert!(matches!(
            store.write_raw(&k, b"x"),
            Err(CacheError::SchemaMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_update_raw() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let k = key("0x1");

        assert_eq!(store.update_raw(&k, |_| None)?, None);
        assert_eq!(store.read_raw(&k)?, None);

        let outcome = store.update_raw(&k, |current| {
            assert!(current.is_none());
            Some(b"1".to_vec())
        })?;
        assert_eq!(outcome, Some(WriteOutcome::Inserted));

        let outcome = store.update_raw(&k, |current| {
            let mut next = current.unwrap().to_vec();
            next.push(b'2');
            Some(next)
        })?;
        assert_eq!(outcome, Some(WriteOutcome::Replaced));
        assert_eq!(store.read_raw(&k)?, Some(b"12".to_vec()));

        let outcome = store.update_raw(&k, |current| current.map(<[u8]>::to_vec))?;
        assert_eq!(outcome, Some(WriteOutcome::Unchanged));
        Ok(())
    }

    #[test]
    fn test_oversized_payload_is_rejected_before_writing() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        // The oversized key sorts first, so a stored copy would hide `small`.
        let big = key("0x1");
        let small = key("0x2");
        assert_eq!(small.shard(), big.shard());
        store.write_raw(&small, b"small")?;

        let payload = vec![0u8; crate::codec::MAX_FIELD_BYTES + 1];
        let err = store.write_raw(&big, &payload).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ITEM");
        let err = store.update_raw(&big, |_| Some(payload.clone())).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ITEM");

        assert_eq!(store.read_raw(&small)?, Some(b"small".to_vec()));
        assert_eq!(store.read_raw(&big)?, None);
        assert_eq!(store.records()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_invalidate_if_skips_rewritten_record() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let k = key("0x1");
        store.write_raw(&k, b"broken")?;
        store.write_raw(&k, b"repaired")?;

        assert!(!store.invalidate_if(&k, b"broken")?);
        assert_eq!(store.read_raw(&k)?, Some(b"repaired".to_vec()));
        assert!(store.invalidate_if(&k, b"repaired")?);
        assert_eq!(store.read_raw(&k)?, None);
        assert!(!store.invalidate_if(&k, b"repaired")?);
        Ok(())
    }

    #[test]
    fn test_busy_shard_times_out() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = open(&tmp)?;
        let k = key("0x1");
        let _held = ShardLock::acquire(&lock_path(store.dir(), k.shard()), store.lock_options())?;

        let err = store.write_raw(&k, b"x").unwrap_err();
        assert_eq!(err.error_code(), "LOCK_TIMEOUT");
        // Readers are not blocked by the writer lock.
        assert_eq!(store.read_raw(&k)?, None);
        Ok(())
    }
}
