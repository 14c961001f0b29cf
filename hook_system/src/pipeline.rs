//! Phase runner
//!
//! This module executes resolved hooks around a dispatched operation. A
//! phase with no declared hook is a no-op; a hook returning `None` leaves
//! the prior bag unchanged (fail-open).

use crate::bag::HookBag;
use crate::phase::HookPhase;
use crate::registry::HookSet;
use crate::types::HookError;

/// Run a single hook phase for one entity operation.
///
/// Errors from the hook propagate to the caller; the pipeline itself never
/// retries or swallows them.
pub async fn run_phase(
    hooks: &HookSet,
    operation: &str,
    phase: HookPhase,
    bag: HookBag,
) -> Result<HookBag, HookError> {
    let Some(hook) = hooks.resolve(operation, phase) else {
        return Ok(bag);
    };

    tracing::debug!(operation, phase = %phase, "running hook");

    // The hook consumes the bag; keep a copy so a None return is fail-open.
    let prior = bag.clone();
    match hook(bag).await? {
        Some(next) => Ok(next),
        None => Ok(prior),
    }
}

/// Run the two pre-dispatch phases in order: beforeResolver (veto point),
/// then beforeQuery.
pub async fn run_pre_dispatch(
    hooks: &HookSet,
    operation: &str,
    bag: HookBag,
) -> Result<HookBag, HookError> {
    let bag = run_phase(hooks, operation, HookPhase::BeforeResolver, bag).await?;
    run_phase(hooks, operation, HookPhase::BeforeQuery, bag).await
}
