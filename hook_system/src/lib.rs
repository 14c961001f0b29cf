//! Hook pipeline for data-access operations
//!
//! This crate provides the interception layer wrapped around every dispatched
//! operation in the polystore ecosystem: four ordered phases (before-resolver,
//! before-query, after-query, after-resolver), per-entity hook sets with an
//! "all operations" override, and a fail-open phase runner.

pub mod bag;
pub mod phase;
pub mod pipeline;
pub mod prelude;
pub mod registry;
pub mod types;

pub use bag::HookBag;
pub use phase::HookPhase;
pub use pipeline::{run_phase, run_pre_dispatch};
pub use registry::{HookSet, PhaseMap};
pub use types::{hook, HookError, HookFn, HookFuture};
