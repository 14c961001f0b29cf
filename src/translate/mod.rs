//! Filter translators
//!
//! One pure translator per dialect, converting the backend-agnostic filter
//! tree into a store-native query representation: a query object for the
//! document dialect, a parameterized SQL fragment plus positional parameters
//! for the relational dialect.

pub mod document;
pub mod relational;

pub use relational::SqlFilter;
