//! Hook bag definition
//!
//! This module defines the mutable envelope threaded through one request's
//! hook phases.

use serde_json::Value;

/// Mutable envelope threaded through the hook phases of one request.
///
/// Every field is a plain JSON value so a phase can replace any of them
/// before returning the bag. The bag is constructed per request and discarded
/// once the response is produced.
#[derive(Debug, Clone, Default)]
pub struct HookBag {
    /// The normalized operation payload as received at the boundary.
    pub args: Value,
    /// The current filter in wire form; `beforeQuery` may rewrite it and the
    /// dispatcher re-reads it afterward.
    pub filter: Option<Value>,
    /// The current write payload (create/update field map).
    pub payload: Option<Value>,
    /// Opaque caller identity supplied by the identity collaborator before
    /// `beforeResolver` runs.
    pub context: Value,
    /// The raw dispatcher result, present from `afterQuery` onward.
    pub result: Option<Value>,
}

impl HookBag {
    pub fn new(args: Value) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_filter(mut self, filter: Option<Value>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Take the result out of the bag, leaving `None` behind.
    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }
}
