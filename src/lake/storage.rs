// ABOUTME: Object storage abstraction for lake table data
// ABOUTME: Defines the ObjectStorage trait and a local-filesystem implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Flat key/value object storage holding table data files
///
/// Keys use `/` separators (`chinook/Album/part-00000.snappy.parquet`).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fully qualified URL for a key or key prefix
    fn url(&self, key: &str) -> String;

    /// All keys starting with `prefix`, sorted
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    async fn delete_keys(&self, keys: &[String]) -> Result<()>;

    /// Write an object, replacing any existing object under the same key
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Object storage rooted at a local directory
///
/// Each key maps to a file below the root. Writes go through a temporary
/// file in the destination directory and are renamed into place.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create the root directory if needed and canonicalize it
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create storage root {}", root.display()))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve storage root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        Some(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    fn url(&self, key: &str) -> String {
        format!("file://{}/{}", self.root.display(), key)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        // Walk from the deepest directory the prefix fully names
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = self.path_for(dir_part);

        match tokio::fs::metadata(&start).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Ok(Vec::new()),
        }

        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Failed to list directory {}", dir.display()))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .with_context(|| format!("Failed to stat {}", path.display()))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            let path = self.path_for(key);
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to delete object {}", path.display()))?;
            tracing::debug!("Deleted {}", path.display());
        }
        Ok(())
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.path_for(key);
        let size = body.len();

        write_atomically(path.clone(), body).await?;

        tracing::debug!("Wrote {} bytes to {}", size, path.display());
        Ok(())
    }
}

/// Replace the file at `path` with `body` via a temp file and rename
///
/// Parent directories are created as needed. The temp file lives next to the
/// target so the rename never crosses filesystems.
pub(crate) async fn write_atomically(path: PathBuf, body: Vec<u8>) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent)
        .await
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(&body)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist {}", path.display()))?;
        Ok(())
    })
    .await
    .context("File write task failed")?
}
