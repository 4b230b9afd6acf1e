//! Usage: Response cache keyed by request fingerprint (in-memory and on-disk stores).
//!
//! Stores are shared across concurrent dispatches. Reads racing a write for the same
//! fingerprint may observe either the old or the new payload (last writer wins).

use crate::client::fingerprint::Fingerprint;
use crate::shared::mutex_ext::MutexExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub const DEFAULT_MEMORY_CACHE_MAX_ENTRIES: usize = 512;

pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &Fingerprint) -> Option<Value>;
    fn put(&self, key: &Fingerprint, payload: Value);
    fn remove(&self, key: &Fingerprint);
    fn clear(&self);
}

#[derive(Debug)]
struct MemoryEntry {
    payload: Value,
    inserted_seq: u64,
}

#[derive(Debug)]
pub struct MemoryResponseCache {
    max_entries: usize,
    next_seq: AtomicU64,
    entries: Mutex<HashMap<Fingerprint, MemoryEntry>>,
}

impl Default for MemoryResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CACHE_MAX_ENTRIES)
    }
}

impl MemoryResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            next_seq: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock_or_recover().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseCache for MemoryResponseCache {
    fn get(&self, key: &Fingerprint) -> Option<Value> {
        self.entries
            .lock_or_recover()
            .get(key)
            .map(|entry| entry.payload.clone())
    }

    fn put(&self, key: &Fingerprint, payload: Value) {
        let inserted_seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock_or_recover();

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, v)| v.inserted_seq)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            key.clone(),
            MemoryEntry {
                payload,
                inserted_seq,
            },
        );
    }

    fn remove(&self, key: &Fingerprint) {
        self.entries.lock_or_recover().remove(key);
    }

    fn clear(&self) {
        self.entries.lock_or_recover().clear();
    }
}

/// One JSON file per fingerprint under `dir`.
#[derive(Debug, Clone)]
pub struct FileResponseCache {
    dir: PathBuf,
}

impl FileResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl ResponseCache for FileResponseCache {
    fn get(&self, key: &Fingerprint) -> Option<Value> {
        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %path.display(), "response cache read failed: {}", err);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), "response cache entry corrupt; treating as miss: {}", err);
                None
            }
        }
    }

    fn put(&self, key: &Fingerprint, payload: Value) {
        let path = self.entry_path(key);
        let encoded = match serde_json::to_vec(&payload) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(fingerprint = %key, "response cache encode failed: {}", err);
                return;
            }
        };

        // Readers only ever see a complete file: write aside, then rename over.
        let tmp_path = self.dir.join(format!(
            "{}.{}.tmp",
            key.as_str(),
            rand::random::<u32>()
        ));
        let result = std::fs::write(&tmp_path, &encoded).and_then(|_| std::fs::rename(&tmp_path, &path));
        if let Err(err) = result {
            let _ = std::fs::remove_file(&tmp_path);
            tracing::warn!(path = %path.display(), "response cache write failed: {}", err);
        }
    }

    fn remove(&self, key: &Fingerprint) {
        let path = self.entry_path(key);
        if let Err(err) = std::fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), "response cache remove failed: {}", err);
            }
        }
    }

    fn clear(&self) {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), "response cache clear failed: {}", err);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}
