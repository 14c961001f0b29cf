//! Hook declarations and resolution
//!
//! This module defines the per-entity hook set and the total resolution
//! logic: an "all operations" hook for a phase, when declared, is used
//! exclusively; otherwise the per-operation hook; otherwise the phase is a
//! no-op.

use crate::phase::HookPhase;
use crate::types::HookFn;
use std::collections::HashMap;

/// Hooks declared for one operation (or for all operations), keyed by phase.
#[derive(Clone, Default)]
pub struct PhaseMap {
    before_resolver: Option<HookFn>,
    before_query: Option<HookFn>,
    after_query: Option<HookFn>,
    after_resolver: Option<HookFn>,
}

impl std::fmt::Debug for PhaseMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseMap")
            .field("before_resolver", &self.before_resolver.is_some())
            .field("before_query", &self.before_query.is_some())
            .field("after_query", &self.after_query.is_some())
            .field("after_resolver", &self.after_resolver.is_some())
            .finish()
    }
}

impl PhaseMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a hook for one phase, replacing any previous declaration.
    pub fn on(mut self, phase: HookPhase, hook: HookFn) -> Self {
        match phase {
            HookPhase::BeforeResolver => self.before_resolver = Some(hook),
            HookPhase::BeforeQuery => self.before_query = Some(hook),
            HookPhase::AfterQuery => self.after_query = Some(hook),
            HookPhase::AfterResolver => self.after_resolver = Some(hook),
        }
        self
    }

    pub fn get(&self, phase: HookPhase) -> Option<&HookFn> {
        match phase {
            HookPhase::BeforeResolver => self.before_resolver.as_ref(),
            HookPhase::BeforeQuery => self.before_query.as_ref(),
            HookPhase::AfterQuery => self.after_query.as_ref(),
            HookPhase::AfterResolver => self.after_resolver.as_ref(),
        }
    }
}

/// All hooks declared for one entity.
///
/// `all` applies to every operation; `by_operation` is keyed by the lowercase
/// operation name ("find", "count", "create", "update", "delete", "upload").
#[derive(Clone, Default)]
pub struct HookSet {
    all: Option<PhaseMap>,
    by_operation: HashMap<String, PhaseMap>,
}

impl std::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSet")
            .field("all", &self.all)
            .field("operations", &self.by_operation.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare hooks that apply to all operations. For any phase declared
    /// here, per-operation hooks for that phase are never consulted.
    pub fn for_all(mut self, phases: PhaseMap) -> Self {
        self.all = Some(phases);
        self
    }

    /// Declare hooks for one operation.
    pub fn for_operation(mut self, operation: &str, phases: PhaseMap) -> Self {
        self.by_operation.insert(operation.to_string(), phases);
        self
    }

    /// Resolve the hook for one operation and phase.
    ///
    /// An "all operations" hook declared for `phase` wins exclusively over
    /// any per-operation hook for the same phase.
    pub fn resolve(&self, operation: &str, phase: HookPhase) -> Option<&HookFn> {
        if let Some(all) = &self.all {
            if let Some(hook) = all.get(phase) {
                return Some(hook);
            }
        }
        self.by_operation
            .get(operation)
            .and_then(|phases| phases.get(phase))
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_none() && self.by_operation.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::HookBag;
    use crate::types::hook;
    use serde_json::json;

    fn tagging_hook(tag: &'static str) -> HookFn {
        hook(move |mut bag: HookBag| async move {
            bag.context = json!(tag);
            Ok(Some(bag))
        })
    }

    #[tokio::test]
    async fn all_operations_hook_wins_over_per_operation() {
        let set = HookSet::new()
            .for_all(PhaseMap::new().on(HookPhase::BeforeQuery, tagging_hook("all")))
            .for_operation(
                "create",
                PhaseMap::new().on(HookPhase::BeforeQuery, tagging_hook("create-only")),
            );

        let resolved = set.resolve("create", HookPhase::BeforeQuery).unwrap();
        let bag = resolved(HookBag::default()).await.unwrap().unwrap();
        assert_eq!(bag.context, json!("all"));
    }

    #[tokio::test]
    async fn falls_back_to_per_operation_for_undeclared_phase() {
        // "all" declares beforeQuery only, so afterQuery resolves per-operation
        let set = HookSet::new()
            .for_all(PhaseMap::new().on(HookPhase::BeforeQuery, tagging_hook("all")))
            .for_operation(
                "find",
                PhaseMap::new().on(HookPhase::AfterQuery, tagging_hook("find-after")),
            );

        let resolved = set.resolve("find", HookPhase::AfterQuery).unwrap();
        let bag = resolved(HookBag::default()).await.unwrap().unwrap();
        assert_eq!(bag.context, json!("find-after"));
    }

    #[test]
    fn undeclared_phase_resolves_to_none() {
        let set = HookSet::new().for_operation(
            "delete",
            PhaseMap::new().on(HookPhase::BeforeResolver, tagging_hook("veto")),
        );

        assert!(set.resolve("delete", HookPhase::AfterQuery).is_none());
        assert!(set.resolve("find", HookPhase::BeforeResolver).is_none());
    }
}
