// src/watch/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hash the contents of one file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Combine per-file hashes into one.
///
/// `hashes` must be ordered by file path.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Last seen content hash per watch target.
pub trait HashStore: Send {
    fn load(&self, target: &str) -> Option<String>;
    fn save(&mut self, target: &str, hash: &str);
}

/// Hashes kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, target: &str) -> Option<String> {
        self.map.get(target).cloned()
    }

    fn save(&mut self, target: &str, hash: &str) {
        debug!(watch_target = %target, hash = %hash, "stored content hash");
        self.map.insert(target.to_string(), hash.to_string());
    }
}
