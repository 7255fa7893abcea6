//! Filesystem-backed object store

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncRead;
use uuid::Uuid;

use super::{ObjectStore, StorageError, validate_key};

/// Stores each object as a file under `root`, keyed by its relative path
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // A key only ever appears with its full contents: stage, then link into place
        let staging = staging_path(&path);
        write_staged(&staging, bytes).await?;

        let linked = tokio::fs::hard_link(&staging, &path).await;
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            tracing::warn!(path = %staging.display(), error = %e, "Failed to remove staging file");
        }

        match linked {
            Ok(()) => {
                tracing::debug!(key = %key, size = bytes.len(), content_type = %content_type, "Stored object");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StorageError::AlreadyExists(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_folders(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.path_for(prefix.trim_end_matches('/'))?
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut folders = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                folders.push(format!("{}/", name));
            }
        }
        folders.sort();
        Ok(folders)
    }
}

/// Hidden sibling of `path`, unique per write
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

/// Copy `source` into a new file at `path`, removing the file again if the copy fails
async fn write_staged<R>(path: &Path, mut source: R) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    if let Err(e) = copy_into_new(path, &mut source).await {
        if let Err(cleanup) = tokio::fs::remove_file(path).await
            && cleanup.kind() != ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial write");
        }
        return Err(e);
    }
    Ok(())
}

async fn copy_into_new<R>(path: &Path, source: &mut R) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    tokio::io::copy(source, &mut file).await?;
    file.sync_all().await
}
