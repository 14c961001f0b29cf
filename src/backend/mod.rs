//! Backend connections
//!
//! One closed polymorphic interface per store, selected once per entity at
//! boot and held in the pool entry. The dispatcher talks to every store
//! through [`BackendConnection`]; rows cross the seam as plain JSON values.

pub mod document;
pub mod object_store;
pub mod relational;

use crate::entity::Dialect;
use crate::translate::SqlFilter;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use document::{DocumentConnection, DocumentStore};
pub use object_store::{FsObjectStorage, ObjectStorage, ObjectStoreConnection};
pub use relational::RelationalConnection;

/// Error raised by a backend driver for one request
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("database driver error: {0}")]
    Driver(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("operation '{operation}' is not supported by the {dialect} backend")]
    Unsupported {
        operation: &'static str,
        dialect: &'static str,
    },

    #[error("query was built for another dialect (expected {expected})")]
    DialectMismatch { expected: &'static str },

    #[error("row decoding error: {0}")]
    Decode(String),
}

/// Store-native query handed from the translators to a backend
#[derive(Debug, Clone)]
pub enum NativeQuery {
    Document(DocumentQuery),
    Sql(SqlQuery),
}

/// Translated query for the document dialect
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    /// Query object, e.g. `{"$and": [{"status": {"$eq": "SHIPPED"}}]}`.
    pub filter: Value,
    /// Sort object with 1/-1 directions.
    pub sort: Value,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

/// Translated query for the relational dialect
#[derive(Debug, Clone)]
pub struct SqlQuery {
    pub filter: SqlFilter,
    /// Rendered `ORDER BY ...` clause, possibly empty.
    pub order_by: String,
    /// Rendered `LIMIT ...` clause, possibly empty.
    pub limit: String,
}

/// One live backend client bound to a single entity.
///
/// Connections are created once at boot and never closed or health-checked
/// during normal operation; a broken underlying connection surfaces as a
/// per-request error.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn find(&self, query: &NativeQuery) -> Result<Vec<Value>, BackendError>;

    async fn count(&self, query: &NativeQuery) -> Result<i64, BackendError>;

    async fn create(&self, row: Map<String, Value>) -> Result<Value, BackendError>;

    async fn update(
        &self,
        query: &NativeQuery,
        fields: Map<String, Value>,
    ) -> Result<Vec<Value>, BackendError>;

    async fn delete(&self, query: &NativeQuery) -> Result<u64, BackendError>;

    /// Delegate object storage to the upload collaborator and return the
    /// completed object location.
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, BackendError> {
        let _ = (name, bytes);
        Err(BackendError::Unsupported {
            operation: "upload",
            dialect: self.dialect().as_str(),
        })
    }
}
