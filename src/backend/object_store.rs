//! Object-store backend
//!
//! The upload collaborator: stores a blob and returns its completed location
//! string. Entities with the object-store dialect bind directly to this
//! adapter; document and relational entities reach it through their own
//! connection's `upload`.

use super::{BackendConnection, BackendError, NativeQuery};
use crate::entity::Dialect;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Blob storage collaborator
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the bytes and return the object's location string.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, BackendError>;
}

/// Filesystem-backed object storage
pub struct FsObjectStorage {
    root: PathBuf,
}

impl FsObjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, BackendError> {
        tokio::fs::create_dir_all(&self.root).await?;

        // Unique object key; the original file name stays readable
        let key = format!("{}_{}", uuid::Uuid::new_v4().simple(), name);
        let path = self.root.join(&key);
        tokio::fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Pool entry for an entity with the object-store dialect. Query operations
/// have no meaning here; only upload is supported.
pub struct ObjectStoreConnection {
    storage: Arc<dyn ObjectStorage>,
}

impl ObjectStoreConnection {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    fn unsupported<T>(operation: &'static str) -> Result<T, BackendError> {
        Err(BackendError::Unsupported {
            operation,
            dialect: "object_store",
        })
    }
}

#[async_trait]
impl BackendConnection for ObjectStoreConnection {
    fn dialect(&self) -> Dialect {
        Dialect::ObjectStore
    }

    async fn find(&self, _query: &NativeQuery) -> Result<Vec<Value>, BackendError> {
        Self::unsupported("find")
    }

    async fn count(&self, _query: &NativeQuery) -> Result<i64, BackendError> {
        Self::unsupported("count")
    }

    async fn create(&self, _row: Map<String, Value>) -> Result<Value, BackendError> {
        Self::unsupported("create")
    }

    async fn update(
        &self,
        _query: &NativeQuery,
        _fields: Map<String, Value>,
    ) -> Result<Vec<Value>, BackendError> {
        Self::unsupported("update")
    }

    async fn delete(&self, _query: &NativeQuery) -> Result<u64, BackendError> {
        Self::unsupported("delete")
    }

    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, BackendError> {
        self.storage.put(name, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_bytes_and_returns_location() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsObjectStorage::new(dir.path());

        let location = storage.put("invoice.pdf", b"%PDF-1.4").await.unwrap();
        assert!(location.ends_with("_invoice.pdf"));

        let stored = tokio::fs::read(&location).await.unwrap();
        assert_eq!(stored, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn query_operations_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let conn = ObjectStoreConnection::new(Arc::new(FsObjectStorage::new(dir.path())));

        let query = NativeQuery::Document(super::super::DocumentQuery {
            filter: serde_json::json!({}),
            sort: serde_json::json!({}),
            skip: None,
            take: None,
        });
        assert!(matches!(
            conn.find(&query).await.unwrap_err(),
            BackendError::Unsupported { operation: "find", .. }
        ));
    }
}
