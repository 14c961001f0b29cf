//! Convenience re-exports for common hook-system usage

pub use crate::bag::HookBag;
pub use crate::phase::HookPhase;
pub use crate::pipeline::{run_phase, run_pre_dispatch};
pub use crate::registry::{HookSet, PhaseMap};
pub use crate::types::{hook, HookError, HookFn, HookFuture};
