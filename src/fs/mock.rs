// src/fs/mock.rs

use super::{normalize, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    read_only: HashSet<PathBuf>,
    writes: usize,
}

/// In-memory filesystem for tests.
///
/// Paths are normalized on the way in, so `./a/b.less` and `a/b.less` refer
/// to the same entry.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        insert_file(&mut state.entries, &path, content.into());
    }

    /// Make every subsequent write to `path` fail.
    pub fn set_read_only(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.state.lock().unwrap().read_only.insert(path);
    }

    /// Contents of a file as UTF-8, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = normalize(path.as_ref());
        let state = self.state.lock().unwrap();
        match state.entries.get(&path) {
            Some(MockEntry::File(bytes)) => String::from_utf8(bytes.clone()).ok(),
            _ => None,
        }
    }

    /// Number of successful writes performed through the trait.
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

fn insert_file(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path, content: Vec<u8>) {
    entries.insert(path.to_path_buf(), MockEntry::File(content));
    let parent = parent_of(path);
    ensure_dir_entry(entries, &parent);
    link_child(entries, &parent, path);
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));

    let parent = parent_of(path);
    // Avoid infinite loop at root
    if parent != path && path.parent().is_some() {
        ensure_dir_entry(entries, &parent);
        link_child(entries, &parent, path);
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = normalize(path);
        let state = self.state.lock().unwrap();
        match state.entries.get(&path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let path = normalize(path);
        let state = self.state.lock().unwrap();
        match state.entries.get(&path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let path = normalize(path);
        let mut state = self.state.lock().unwrap();
        if state.read_only.contains(&path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        insert_file(&mut state.entries, &path, contents.to_vec());
        state.writes += 1;
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(&normalize(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(&normalize(path)), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = normalize(path);
        let state = self.state.lock().unwrap();
        match state.entries.get(&path) {
            Some(MockEntry::Dir(children)) => {
                let base = if path == Path::new(".") {
                    PathBuf::new()
                } else {
                    path.clone()
                };
                Ok(children.iter().map(|name| base.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
