//! Kernel binary cache.
//!
//! A cache only ever saves a recompilation: entries are keyed by (kind, device name, hash
//! of the source text) and a hit is confirmed by comparing the stored text exactly, so a
//! hash collision degrades to a miss. I/O failures are logged and treated as misses.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use snafu::ResultExt;

use crate::error::{CacheIoSnafu, Result};

/// Capability interface for storing compiled kernel binaries.
pub trait KernelCache: Send + Sync + fmt::Debug {
    /// Binary previously stored for exactly `text`, if any.
    fn get(&self, kind: &str, device: &str, text: &str) -> Option<Vec<u8>>;

    /// Store `binary` for `text`, replacing any existing entry with the same key.
    fn put(&self, kind: &str, device: &str, text: &str, binary: &[u8]);
}

/// Cache that never hits and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl KernelCache for NullCache {
    fn get(&self, _kind: &str, _device: &str, _text: &str) -> Option<Vec<u8>> {
        None
    }

    fn put(&self, _kind: &str, _device: &str, _text: &str, _binary: &[u8]) {}
}

/// djb2 string hash (`h = h * 33 + byte`, seeded with 5381).
pub fn djb_hash(text: &str) -> u64 {
    text.bytes().fold(5381u64, |h, byte| h.wrapping_shl(5).wrapping_add(h).wrapping_add(u64::from(byte)))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    kind: String,
    device: String,
    hash: u64,
}

#[derive(Debug)]
struct Entry {
    text: String,
    binary: Vec<u8>,
}

#[derive(Debug)]
enum Store {
    Memory(Mutex<HashMap<EntryKey, Entry>>),
    Directory(PathBuf),
}

/// Cache backed by a directory, or by process memory.
///
/// On disk each entry is one file named after its key, holding the source text length
/// (8 bytes, little endian), the source text and the binary. Files are replaced by rename
/// so concurrent readers never observe a partial entry.
#[derive(Debug)]
pub struct PersistentCache {
    store: Store,
}

impl PersistentCache {
    /// Cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self { store: Store::Memory(Mutex::new(HashMap::new())) }
    }

    /// Cache stored under `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).context(CacheIoSnafu { path: dir.clone() })?;
        Ok(Self { store: Store::Directory(dir) })
    }

    /// Directory backing the cache, `None` when in memory.
    pub fn location(&self) -> Option<&Path> {
        match &self.store {
            Store::Directory(dir) => Some(dir),
            Store::Memory(_) => None,
        }
    }

    fn entry_path(dir: &Path, key: &EntryKey) -> PathBuf {
        let sanitize = |s: &str| -> String {
            s.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
        };
        dir.join(format!("{}-{}-{:016x}.kbin", sanitize(&key.kind), sanitize(&key.device), key.hash))
    }

    fn read_entry(path: &Path) -> std::io::Result<Option<Entry>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let corrupt = || std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated cache entry");
        let (len, rest) = bytes.split_first_chunk::<8>().ok_or_else(corrupt)?;
        let len = usize::try_from(u64::from_le_bytes(*len)).map_err(|_| corrupt())?;
        if rest.len() < len {
            return Err(corrupt());
        }
        let (text, binary) = rest.split_at(len);
        let text = String::from_utf8(text.to_vec()).map_err(|_| corrupt())?;
        Ok(Some(Entry { text, binary: binary.to_vec() }))
    }

    fn write_entry(dir: &Path, path: &Path, text: &str, binary: &[u8]) -> std::io::Result<()> {
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(&(text.len() as u64).to_le_bytes())?;
        file.write_all(text.as_bytes())?;
        file.write_all(binary)?;
        file.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl KernelCache for PersistentCache {
    fn get(&self, kind: &str, device: &str, text: &str) -> Option<Vec<u8>> {
        let key = EntryKey { kind: kind.to_string(), device: device.to_string(), hash: djb_hash(text) };
        let hit = match &self.store {
            Store::Memory(map) => {
                map.lock().get(&key).filter(|entry| entry.text == text).map(|entry| entry.binary.clone())
            }
            Store::Directory(dir) => {
                let path = Self::entry_path(dir, &key);
                match Self::read_entry(&path) {
                    Ok(entry) => entry.filter(|entry| entry.text == text).map(|entry| entry.binary),
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable kernel cache entry");
                        None
                    }
                }
            }
        };
        tracing::trace!(cache.kind = kind, cache.device = device, cache.hash = key.hash, hit = hit.is_some(), "kernel cache lookup");
        hit
    }

    fn put(&self, kind: &str, device: &str, text: &str, binary: &[u8]) {
        let key = EntryKey { kind: kind.to_string(), device: device.to_string(), hash: djb_hash(text) };
        match &self.store {
            Store::Memory(map) => {
                map.lock().insert(key, Entry { text: text.to_string(), binary: binary.to_vec() });
            }
            Store::Directory(dir) => {
                let path = Self::entry_path(dir, &key);
                if let Err(err) = Self::write_entry(dir, &path, text, binary) {
                    tracing::warn!(path = %path.display(), error = %err, "failed to store kernel cache entry");
                }
            }
        }
    }
}
