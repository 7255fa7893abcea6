//! Object storage for uploaded documents, page previews and reports

pub mod folders;
pub mod local;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

pub use folders::allocate_upload_folder;
pub use local::LocalObjectStore;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Minimal object store contract used by the pipeline.
///
/// `put` never overwrites: writing an existing key fails with
/// [`StorageError::AlreadyExists`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Immediate child folder names under `prefix` (each ending with `/`)
    async fn list_folders(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Reject keys that could escape the store root
fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment == ".." || segment == ".");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("uploads/upload_id_001/a.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("uploads/../secrets").is_err());
        assert!(validate_key("uploads\\a").is_err());
    }
}
