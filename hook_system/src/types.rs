//! Hook function types
//!
//! This module contains the boxed async callback type used for hook
//! functions and the hook error type.

use crate::bag::HookBag;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a hook function. `Ok(None)` means "no change": the
/// pipeline reuses the prior bag unchanged (fail-open).
pub type HookFuture = BoxFuture<'static, Result<Option<HookBag>, HookError>>;

/// Async hook callback. A hook receives the current bag, may replace any of
/// its fields, and returns the (possibly new) bag or `None`.
pub type HookFn = Arc<dyn Fn(HookBag) -> HookFuture + Send + Sync>;

/// Wrap an async closure into a [`HookFn`].
///
/// ```rust
/// use hook_system::{hook, HookBag};
///
/// let tag = hook(|mut bag: HookBag| async move {
///     bag.context = serde_json::json!({"tagged": true});
///     Ok(Some(bag))
/// });
/// ```
pub fn hook<F, Fut>(f: F) -> HookFn
where
    F: Fn(HookBag) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<HookBag>, HookError>> + Send + 'static,
{
    Arc::new(move |bag| Box::pin(f(bag)))
}

/// Failure raised by a hook function
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The hook vetoed the operation.
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The hook itself failed.
    #[error("hook failed: {0}")]
    Failed(#[from] anyhow::Error),
}
