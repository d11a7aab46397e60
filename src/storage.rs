// Storage/asset providers
//
// Named blobs with modification timestamps. Reads search the save directory
// before the source directory, so previously written output shadows shipped
// files. Writes always go to the save directory.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub bytes: Vec<u8>,
    pub modified: SystemTime,
}

impl StoredAsset {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

pub trait AssetStorage {
    /// Contents and timestamp, or `None` when the asset does not exist
    fn read(&self, path: &str) -> Option<StoredAsset>;

    /// Timestamp only, without reading the contents
    fn timestamp(&self, path: &str) -> Option<SystemTime>;

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Source compiled into the binary under the same logical path
    fn read_embedded(&self, path: &str) -> Option<&'static str>;
}

/// Logical path -> source text table of shaders shipped inside the binary
pub type EmbeddedTable = &'static [(&'static str, &'static str)];

fn find_embedded(table: EmbeddedTable, path: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(name, _)| *name == path)
        .map(|(_, source)| *source)
}

// =============================================================================
// FILESYSTEM
// =============================================================================

pub struct FileStorage {
    source_root: PathBuf,
    save_root: PathBuf,
    embedded: EmbeddedTable,
}

impl FileStorage {
    pub fn new(source_root: impl Into<PathBuf>, save_root: impl Into<PathBuf>, embedded: EmbeddedTable) -> Self {
        Self {
            source_root: source_root.into(),
            save_root: save_root.into(),
            embedded,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    fn locate(&self, path: &str) -> Option<PathBuf> {
        [&self.save_root, &self.source_root]
            .into_iter()
            .map(|root| root.join(path))
            .find(|full| full.is_file())
    }
}

impl AssetStorage for FileStorage {
    fn read(&self, path: &str) -> Option<StoredAsset> {
        let full = self.locate(path)?;
        let read = || -> std::io::Result<StoredAsset> {
            let bytes = std::fs::read(&full)?;
            let modified = std::fs::metadata(&full)?.modified()?;
            Ok(StoredAsset { bytes, modified })
        };
        match read() {
            Ok(asset) => Some(asset),
            Err(e) => {
                log::warn!("Failed to read {:?}: {}", full, e);
                None
            }
        }
    }

    fn timestamp(&self, path: &str) -> Option<SystemTime> {
        let full = self.locate(path)?;
        std::fs::metadata(full).and_then(|meta| meta.modified()).ok()
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.save_root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        std::fs::write(&full, bytes).with_context(|| format!("Failed to write {:?}", full))
    }

    fn read_embedded(&self, path: &str) -> Option<&'static str> {
        find_embedded(self.embedded, path)
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

#[derive(Debug, Default)]
struct MemoryFiles {
    files: HashMap<String, StoredAsset>,
    embedded: HashMap<String, &'static str>,
    clock: u64,
    writes: usize,
    fail_writes: bool,
}

impl MemoryFiles {
    /// Logical clock: every mutation is strictly newer than the last one
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.clock)
    }
}

/// In-memory storage. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryFiles>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, contents: &str) {
        let mut inner = self.inner.lock();
        let modified = inner.tick();
        inner.files.insert(
            path.to_string(),
            StoredAsset {
                bytes: contents.as_bytes().to_vec(),
                modified,
            },
        );
    }

    pub fn insert_embedded(&self, path: &str, contents: &'static str) {
        self.inner.lock().embedded.insert(path.to_string(), contents);
    }

    pub fn remove(&self, path: &str) {
        self.inner.lock().files.remove(path);
    }

    /// Bump the timestamp of an existing file
    pub fn touch(&self, path: &str) {
        let mut inner = self.inner.lock();
        let modified = inner.tick();
        if let Some(asset) = inner.files.get_mut(path) {
            asset.modified = modified;
        }
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        self.inner.lock().files.get(path).map(StoredAsset::text)
    }

    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }
}

impl AssetStorage for MemoryStorage {
    fn read(&self, path: &str) -> Option<StoredAsset> {
        self.inner.lock().files.get(path).cloned()
    }

    fn timestamp(&self, path: &str) -> Option<SystemTime> {
        self.inner.lock().files.get(path).map(|asset| asset.modified)
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            anyhow::bail!("storage is read-only");
        }
        let modified = inner.tick();
        inner.writes += 1;
        inner.files.insert(
            path.to_string(),
            StoredAsset {
                bytes: bytes.to_vec(),
                modified,
            },
        );
        Ok(())
    }

    fn read_embedded(&self, path: &str) -> Option<&'static str> {
        self.inner.lock().embedded.get(path).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("renderprogs-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_file_storage_prefers_save_root() {
        let source = scratch_dir("source");
        let save = scratch_dir("save");
        std::fs::create_dir_all(source.join("renderprogs")).unwrap();
        std::fs::write(source.join("renderprogs/a.txt"), "shipped").unwrap();

        let storage = FileStorage::new(&source, &save, &[]);
        assert_eq!(storage.read("renderprogs/a.txt").unwrap().text(), "shipped");

        storage.write("renderprogs/a.txt", b"saved").unwrap();
        assert_eq!(storage.read("renderprogs/a.txt").unwrap().text(), "saved");
        assert!(save.join("renderprogs/a.txt").is_file());
        assert!(storage.timestamp("renderprogs/a.txt").is_some());
        assert!(storage.read("renderprogs/missing.txt").is_none());

        let _ = std::fs::remove_dir_all(source);
        let _ = std::fs::remove_dir_all(save);
    }

    #[test]
    fn test_file_storage_embedded() {
        static TABLE: &[(&str, &str)] = &[("renderprogs/x.vs.hlsl", "void main() {}")];
        let storage = FileStorage::new("does-not-exist", "does-not-exist", TABLE);
        assert_eq!(storage.read_embedded("renderprogs/x.vs.hlsl"), Some("void main() {}"));
        assert_eq!(storage.read_embedded("renderprogs/y.vs.hlsl"), None);
    }

    #[test]
    fn test_memory_storage_clock() {
        let storage = MemoryStorage::new();
        storage.insert("a", "1");
        storage.write("b", b"2").unwrap();
        assert!(storage.timestamp("b").unwrap() > storage.timestamp("a").unwrap());

        storage.touch("a");
        assert!(storage.timestamp("a").unwrap() > storage.timestamp("b").unwrap());

        let shared = storage.clone();
        shared.set_fail_writes(true);
        assert!(storage.write("c", b"3").is_err());
        assert_eq!(storage.write_count(), 1);
    }
}
