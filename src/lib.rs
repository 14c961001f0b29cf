//! # Polystore
//!
//! A configuration-driven data-access middleware: given a declarative
//! description of entities (logical tables/collections, their columns,
//! relations and per-operation hooks), it exposes a uniform CRUD surface
//! (find, count, create, update, delete, upload) and executes each operation
//! against one of several heterogeneous backing stores, with cross-store
//! relation traversal and a multi-phase hook pipeline around every
//! operation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polystore::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_file("polystore.toml")?;
//!     let mut store = PolyStore::new(config).await?;
//!
//!     store.register_hooks(
//!         "orders",
//!         HookSet::new().for_operation(
//!             "delete",
//!             PhaseMap::new().on(
//!                 HookPhase::BeforeResolver,
//!                 hook(|bag: HookBag| async move {
//!                     if bag.context["role"] != json!("admin") {
//!                         return Err(HookError::Rejected("admins only".into()));
//!                     }
//!                     Ok(Some(bag))
//!                 }),
//!             ),
//!         ),
//!     )?;
//!
//!     let shipped = store
//!         .request(
//!             "orders",
//!             json!({"filter": {"_and": [{"status": {"_eq": "SHIPPED"}}]}}),
//!             json!({"role": "admin"}),
//!         )
//!         .await?;
//!     println!("shipped orders: {shipped}");
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod backend;
pub mod core;
pub mod dispatch;
pub mod entity;
pub mod errors;
pub mod filter;
pub mod pool;
pub mod prelude;
pub mod relations;
pub mod translate;

// Re-export the main public types for convenience
pub use crate::core::PolyStore;
pub use crate::dispatch::{Action, DispatchResult, Dispatcher, OperationPayload, Pagination};
pub use crate::entity::{Cardinality, ColumnDescriptor, Dialect, EntityDescriptor, RelationSpec};
pub use crate::errors::{PolyStoreError, TranslationError};
pub use crate::filter::{ComparisonOp, FilterNode, LogicalOp, SortOrder};
pub use crate::pool::{PoolEntry, Registry};
pub use crate::relations::RelationResolver;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, EntityConfig, ObjectStoreConfig};

// Re-export internal crates used in the public API
pub use hook_system;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
