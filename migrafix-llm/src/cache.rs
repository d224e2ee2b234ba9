//! Response cache keyed by the SHA-256 of the prompt.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use migrafix_hash::sha256_hex;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<BTreeMap<String, String>>,
    path: Option<Utf8PathBuf>,
}

pub fn cache_key(prompt: &str) -> String {
    sha256_hex(prompt.as_bytes())
}

impl ResponseCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache backed by `path`. A missing or unreadable file starts empty.
    pub fn load(path: &Utf8Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path, error = %e, "response cache unreadable; starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!(path = %path, entries = entries.len(), "response cache loaded");
        Self {
            entries: Mutex::new(entries),
            path: Some(path.to_path_buf()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, prompt: &str) -> Option<String> {
        self.lock().get(&cache_key(prompt)).cloned()
    }

    pub fn put(&self, prompt: &str, response: &str) {
        self.lock().insert(cache_key(prompt), response.to_string());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache to its backing file, if it has one.
    pub fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
        }
        let json = serde_json::to_string_pretty(&*self.lock())?;
        fs::write(path, json).with_context(|| format!("write {}", path))?;
        Ok(())
    }
}
