//! Concrete [`ots_core::collaborators::Cache`] implementations
//!
//! An in-memory `HashMap`, used by default and in tests, and a file-backed
//! JSON store under the user's cache directory for persistence across CLI
//! invocations (needed so the upgrade cooldown in [`crate::calendar`] survives
//! a process restart).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use ots_core::collaborators::Cache;
use serde::{Deserialize, Serialize};

/// In-process cache backed by a `HashMap`; entries vanish when the process exits
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Option<Instant>)>>,
}

impl MemoryCache {
    /// An empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, Some(expires))) if Instant::now() >= *expires => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) {
        let expires = (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs));
        self.entries.lock().unwrap().insert(key.to_string(), (value, expires));
    }

    async fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

#[derive(Serialize, Deserialize, Default)]
struct FileCacheContents {
    entries: HashMap<String, FileCacheEntry>,
}

#[derive(Serialize, Deserialize)]
struct FileCacheEntry {
    value_hex: String,
    expires_at_unix: Option<u64>,
}

/// JSON-file-backed cache under a directory, persisting across invocations
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, (Vec<u8>, Option<u64>)>>,
}

impl FileCache {
    /// Load (or initialize) a cache file at `dir/cache.json`
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` can't be created or an existing cache file
    /// isn't valid JSON in the expected shape.
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("cache.json");
        let contents = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            FileCacheContents::default()
        };
        let entries = contents
            .entries
            .into_iter()
            .filter_map(|(k, v)| {
                let bytes = hex::decode(&v.value_hex).ok()?;
                Some((k, (bytes, v.expires_at_unix)))
            })
            .collect();
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    fn persist(&self) {
        let entries = self.entries.lock().unwrap();
        let contents = FileCacheContents {
            entries: entries
                .iter()
                .map(|(k, (bytes, expires))| {
                    (
                        k.clone(),
                        FileCacheEntry { value_hex: hex::encode(bytes), expires_at_unix: *expires },
                    )
                })
                .collect(),
        };
        drop(entries);
        if let Ok(json) = serde_json::to_string_pretty(&contents) {
            let _ = std::fs::write(&self.path, json);
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[async_trait]
impl Cache for FileCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let expired = {
            let entries = self.entries.lock().unwrap();
            match entries.get(key) {
                Some((_, Some(expires))) if now_unix() >= *expires => true,
                Some((value, _)) => return Some(value.clone()),
                None => return None,
            }
        };
        if expired {
            self.entries.lock().unwrap().remove(key);
            self.persist();
        }
        None
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) {
        let expires_at = (ttl_secs > 0).then(|| now_unix() + ttl_secs);
        self.entries.lock().unwrap().insert(key.to_string(), (value, expires_at));
        self.persist();
    }

    async fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
        self.persist();
    }
}
