//! Artifact storage collaborators.
//!
//! `store(path, bytes)` persists bytes at a deterministic path and returns a
//! retrievable url. Storing twice at the same path overwrites.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("invalid upload path: {0}")]
    InvalidPath(String),
    #[error("io error at {path}: {message}")]
    Io { path: String, message: String },
    #[error("storage state poisoned")]
    Poisoned,
}

pub trait ArtifactStorage: Send + Sync {
    fn store(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

impl<S> ArtifactStorage for Arc<S>
where
    S: ArtifactStorage + ?Sized,
{
    fn store(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        (**self).store(path, bytes)
    }
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    let mut base = base_url.into();
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Upload paths must stay inside the storage root.
fn validate_path(path: &str) -> Result<(), StorageError> {
    let p = Path::new(path);
    let escapes = path.is_empty()
        || p.components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Stores artifacts under a media root and serves them from a media url.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader following the url never sees a partially written file.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
    base_url: String,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStorage for FilesystemStorage {
    fn store(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_path(path)?;
        let target = self.root.join(path);
        let io_err = |e: std::io::Error| StorageError::Io {
            path: target.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = target.with_extension(format!("tmp-{}", Uuid::now_v7()));
        fs::write(&tmp, bytes).map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }

        debug!(path, bytes = bytes.len(), "artifact stored");
        Ok(format!("{}{}", self.base_url, path))
    }
}

/// In-memory storage for tests/dev.
#[derive(Debug)]
pub struct InMemoryStorage {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            objects: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().ok()?.get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Total number of successful `store` calls (overwrites included).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new("/media/")
    }
}

impl ArtifactStorage for InMemoryStorage {
    fn store(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_path(path)?;
        let mut objects = self.objects.write().map_err(|_| StorageError::Poisoned)?;
        objects.insert(path.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}{}", self.base_url, path))
    }
}
