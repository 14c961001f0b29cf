//! Error types for the polystore crate
//!
//! This module contains the error taxonomy shared by every component:
//! configuration errors are fatal at boot, translation and validation errors
//! surface synchronously before any backend call, and backend/hook failures
//! are masked at the pipeline boundary as a single authorization error.

use thiserror::Error;

/// Error raised while translating a filter tree into a store-native query.
///
/// Raised synchronously before any backend call and surfaced to the caller
/// as a user-facing input error.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("operator {operator} is not supported by the {dialect} dialect")]
    UnsupportedOperator {
        operator: &'static str,
        dialect: &'static str,
    },

    #[error("malformed filter: {0}")]
    InvalidFilter(String),
}

/// Top-level error type for polystore operations
#[derive(Error, Debug)]
pub enum PolyStoreError {
    /// Fatal at boot: unknown dialect, missing foreign entity, duplicate
    /// entity name.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// Malformed write payload, or a destructive operation with an empty
    /// resolved filter.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("backend error: {0}")]
    Backend(#[from] crate::backend::BackendError),

    #[error(transparent)]
    Hook(#[from] hook_system::HookError),

    /// Uniform boundary error wrapping (and thereby obscuring) the original
    /// cause of a hook or backend failure. Part of the legacy contract.
    #[error("operation not permitted")]
    Authorization(#[source] Box<PolyStoreError>),
}

impl PolyStoreError {
    /// Apply the pipeline-boundary masking rule: translation, validation and
    /// configuration errors pass through as user-facing input errors; hook
    /// and backend failures are wrapped as a uniform authorization error.
    pub fn mask_at_boundary(self) -> Self {
        match self {
            e @ (PolyStoreError::Configuration(_)
            | PolyStoreError::Translation(_)
            | PolyStoreError::Validation(_)
            | PolyStoreError::UnknownEntity(_)) => e,
            already @ PolyStoreError::Authorization(_) => already,
            other => PolyStoreError::Authorization(Box::new(other)),
        }
    }
}
