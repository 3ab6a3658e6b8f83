//! Object store collaborators the export stage writes to.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("upload of {key} failed: {source}")]
    Http {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("writing {key} failed: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object key rejected: {0}")]
    Rejected(String),
}

/// Flat key/value object storage.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by the whole
/// export stage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the object could not be written.
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, body).await
    }
}

/// Keys become file or URL path segments, so they must stay flat.
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key.starts_with('.') {
        return Err(StoreError::Rejected(key.to_string()));
    }
    Ok(())
}

// ============================================================================
// Pre-authenticated request URL
// ============================================================================

/// Uploads with a plain HTTP `PUT` to `<prefix><key>`.
///
/// The prefix is a pre-authenticated request URL ending in `/o/`, so no
/// request signing is needed.
#[derive(Debug, Clone)]
pub struct ParStore {
    client: reqwest::Client,
    prefix: String,
}

impl ParStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), prefix)
    }

    pub fn with_client(client: reqwest::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl ObjectStore for ParStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        validate_key(key)?;
        let size = body.len();
        self.client
            .put(self.url_for(key))
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| StoreError::Http {
                key: key.to_string(),
                source,
            })?;
        debug!(key, size, "Uploaded object");
        Ok(())
    }
}

// ============================================================================
// Local directory
// ============================================================================

/// Writes each object to `<root>/<key>`, creating `root` on first use.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for DirectoryStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        validate_key(key)?;
        let io_error = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error)?;
        let path = self.root.join(key);
        tokio::fs::write(&path, body).await.map_err(io_error)?;
        debug!(path = %path.display(), "Wrote object");
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Keeps objects in memory. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    /// Stored keys in lexical order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        validate_key(key)?;
        self.objects.lock().insert(key.to_string(), body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.put("instance_r1.csv", b"a".to_vec()).await.unwrap();
        store.put("instance_r1.csv", b"b".to_vec()).await.unwrap();

        assert_eq!(store.keys(), vec!["instance_r1.csv"]);
        assert_eq!(store.object("instance_r1.csv").unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_nested_keys_are_rejected() {
        let store = MemoryStore::new();
        for key in ["", "../escape.csv", "a/b.csv", ".hidden"] {
            assert!(matches!(
                store.put(key, Vec::new()).await,
                Err(StoreError::Rejected(_))
            ));
        }
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_directory_store_writes_files() {
        let root = std::env::temp_dir().join(format!(
            "tenancy_harvester_store_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos()
        ));
        let store = DirectoryStore::new(&root);

        store.put("region_r1.csv", b"tenancy_id\n".to_vec()).await.unwrap();

        let written = std::fs::read(root.join("region_r1.csv")).unwrap();
        assert_eq!(written, b"tenancy_id\n");
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_par_url() {
        let store = ParStore::new("https://objectstorage.example.com/p/token/n/ns/b/bucket/o/");
        assert_eq!(
            store.url_for("limit_2024-01-01T00-00-00Z.csv"),
            "https://objectstorage.example.com/p/token/n/ns/b/bucket/o/limit_2024-01-01T00-00-00Z.csv"
        );
    }
}
