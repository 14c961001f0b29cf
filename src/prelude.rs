//! Convenience re-exports for common polystore usage
//!
//! # Example
//!
//! ```rust
//! use polystore::prelude::*;
//! ```

// Core polystore components
pub use crate::core::PolyStore;
pub use crate::dispatch::{Action, DispatchResult, Dispatcher, OperationPayload, Pagination};
pub use crate::entity::{Cardinality, ColumnDescriptor, Dialect, EntityDescriptor, RelationSpec};
pub use crate::errors::{PolyStoreError, TranslationError};
pub use crate::filter::{ComparisonOp, FilterNode, LogicalOp, SortOrder};
pub use crate::pool::{PoolEntry, Registry};
pub use crate::relations::RelationResolver;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, EntityConfig, ObjectStoreConfig};

// Re-export the hook pipeline for request interception
pub use hook_system::prelude::*;
