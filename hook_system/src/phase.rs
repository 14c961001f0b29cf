//! Hook phase identifiers
//!
//! This module defines the four interception points around a dispatched
//! operation and their fixed execution order.

use serde::{Deserialize, Serialize};

/// One of the four interception points around a dispatched operation.
///
/// Phases execute in the fixed order `BeforeResolver` -> `BeforeQuery` ->
/// (dispatch) -> `AfterQuery` -> `AfterResolver`. `BeforeResolver` is the
/// veto point: a failure there aborts before any backend I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPhase {
    BeforeResolver,
    BeforeQuery,
    AfterQuery,
    AfterResolver,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::BeforeResolver => "beforeResolver",
            HookPhase::BeforeQuery => "beforeQuery",
            HookPhase::AfterQuery => "afterQuery",
            HookPhase::AfterResolver => "afterResolver",
        }
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
