//! Storing the submitted document under a fresh upload folder

use crate::model::{DocumentRef, UploadedDocument};
use crate::storage::{ObjectStore, StorageError, allocate_upload_folder};

/// Folder allocation races with concurrent uploads; give up after this many collisions
const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

/// Empty object whose create-only write makes a run the sole owner of its folder
const CLAIM_MARKER: &str = ".claim";

const FALLBACK_FILE_NAME: &str = "document";

/// Put the upload at `{prefix}upload_id_NNN/{file_name}`, reallocating on collision.
///
/// The folder is claimed before anything else is written into it, so two
/// concurrent runs never share a folder (and with it page previews or a
/// report key).
pub async fn store_upload(
    store: &dyn ObjectStore,
    prefix: &str,
    document: &UploadedDocument,
) -> Result<DocumentRef, StorageError> {
    let file_name = sanitize_file_name(&document.file_name);
    let mut last_err = None;

    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let folder = allocate_upload_folder(store, prefix).await;

        match store.put(&format!("{}{}", folder, CLAIM_MARKER), &[], "text/plain").await {
            Ok(()) => {}
            Err(e @ StorageError::AlreadyExists(_)) => {
                tracing::warn!(folder = %folder, attempt = attempt, "Upload folder taken, reallocating");
                last_err = Some(e);
                continue;
            }
            Err(e) => return Err(e),
        }

        let key = format!("{}{}", folder, file_name);
        store.put(&key, &document.content, &document.content_type).await?;

        tracing::info!(
            key = %key,
            bytes = document.content.len(),
            media_kind = ?document.media_kind,
            page_count = ?document.page_count,
            "Upload stored"
        );
        return Ok(DocumentRef::new(key));
    }

    Err(last_err.unwrap_or_else(|| StorageError::AlreadyExists(prefix.to_string())))
}

/// Last path component, without anything that could change the key layout
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." || base == CLAIM_MARKER {
        FALLBACK_FILE_NAME.to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::storage::memory::InMemoryObjectStore;

    /// Rejects the first `collisions` writes as if another run got there first
    struct CollidingStore {
        inner: InMemoryObjectStore,
        collisions: Mutex<u32>,
    }

    #[async_trait]
    impl ObjectStore for CollidingStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
            let collide = {
                let mut remaining = self.collisions.lock().unwrap();
                let collide = *remaining > 0;
                if collide {
                    *remaining -= 1;
                }
                collide
            };
            if collide {
                let folder = &key[..=key.rfind('/').unwrap()];
                // the competing run now owns the folder
                self.inner
                    .put(&format!("{}other.pdf", folder), b"x", "application/pdf")
                    .await
                    .ok();
                return Err(StorageError::AlreadyExists(key.to_string()));
            }
            self.inner.put(key, bytes, content_type).await
        }

        async fn list_folders(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            self.inner.list_folders(prefix).await
        }
    }

    /// Suspends inside every call the way filesystem I/O does
    struct YieldingStore {
        inner: InMemoryObjectStore,
    }

    #[async_trait]
    impl ObjectStore for YieldingStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            tokio::task::yield_now().await;
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
            tokio::task::yield_now().await;
            self.inner.put(key, bytes, content_type).await
        }

        async fn list_folders(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            tokio::task::yield_now().await;
            self.inner.list_folders(prefix).await
        }
    }

    fn jpeg(name: &str) -> UploadedDocument {
        UploadedDocument::from_upload(name, "image/jpeg", vec![1, 2, 3]).unwrap()
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("scan.jpg"), "scan.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\a\\справка.pdf"), "справка.pdf");
        assert_eq!(sanitize_file_name(".."), "document");
        assert_eq!(sanitize_file_name("dir/"), "document");
        assert_eq!(sanitize_file_name(".claim"), "document");
    }

    #[tokio::test]
    async fn test_store_upload_in_next_folder() {
        let store = InMemoryObjectStore::new();
        let first = store_upload(&store, "uploads/", &jpeg("a.jpg")).await.unwrap();
        let second = store_upload(&store, "uploads/", &jpeg("a.jpg")).await.unwrap();

        assert_eq!(first.key, "uploads/upload_id_001/a.jpg");
        assert_eq!(second.key, "uploads/upload_id_002/a.jpg");
        assert_eq!(store.content_type(&first.key).as_deref(), Some("image/jpeg"));
        assert!(store.keys().contains(&"uploads/upload_id_001/.claim".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_folders() {
        let store = YieldingStore {
            inner: InMemoryObjectStore::new(),
        };

        let (file_a, file_b) = (jpeg("a.jpg"), jpeg("b.jpg"));
        let (a, b) = tokio::join!(
            store_upload(&store, "uploads/", &file_a),
            store_upload(&store, "uploads/", &file_b),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.folder(), b.folder());
        let mut folders = vec![a.folder().to_string(), b.folder().to_string()];
        folders.sort();
        assert_eq!(folders, vec!["uploads/upload_id_001/", "uploads/upload_id_002/"]);
    }

    #[tokio::test]
    async fn test_collision_reallocates() {
        let store = CollidingStore {
            inner: InMemoryObjectStore::new(),
            collisions: Mutex::new(1),
        };
        let location = store_upload(&store, "uploads/", &jpeg("a.jpg")).await.unwrap();
        assert_eq!(location.key, "uploads/upload_id_002/a.jpg");
    }

    #[tokio::test]
    async fn test_gives_up_after_repeated_collisions() {
        let store = CollidingStore {
            inner: InMemoryObjectStore::new(),
            collisions: Mutex::new(MAX_ALLOCATION_ATTEMPTS),
        };
        let result = store_upload(&store, "uploads/", &jpeg("a.jpg")).await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }
}
