//! Core polystore functionality
//!
//! This module contains the main PolyStore struct: it boots the entity
//! registry, owns the per-entity hook sets, and wraps every dispatched
//! operation in the guarded hook pipeline.

use crate::dispatch::{Action, Dispatcher, OperationPayload, Pagination};
use crate::errors::PolyStoreError;
use crate::pool::Registry;
use crate::relations::RelationResolver;
use config::AppConfig;
use hook_system::{run_phase, run_pre_dispatch, HookBag, HookPhase, HookSet};
use serde_json::Value;

/// Main coordinator that manages backend connections, entity descriptors
/// and the hook pipeline
pub struct PolyStore {
    registry: Registry,
}

impl PolyStore {
    /// Boot the middleware: validate the configuration and open one backend
    /// connection per entity. Configuration problems abort here, never on
    /// the first request.
    pub async fn new(config: AppConfig) -> Result<Self, PolyStoreError> {
        let registry = Registry::open(&config).await?;
        Ok(Self { registry })
    }

    /// Register hooks for an entity. Must happen before serving requests.
    pub fn register_hooks(&mut self, entity: &str, hooks: HookSet) -> Result<(), PolyStoreError> {
        self.registry.register_hooks(entity, hooks)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle one wire-format request: translate it to a normalized payload
    /// at the boundary, then run the guarded pipeline around the dispatcher.
    ///
    /// `context` is the opaque caller identity supplied by the identity
    /// collaborator; it is placed into the hook bag before `beforeResolver`
    /// runs.
    pub async fn request(
        &self,
        entity: &str,
        wire: Value,
        context: Value,
    ) -> Result<Value, PolyStoreError> {
        let payload = OperationPayload::from_wire(&wire)?;
        self.execute(entity, wire, payload, context).await
    }

    /// Run an already-normalized payload through the guarded pipeline.
    pub async fn execute(
        &self,
        entity: &str,
        args: Value,
        payload: OperationPayload,
        context: Value,
    ) -> Result<Value, PolyStoreError> {
        // Failures inside the pipeline are caught exactly once here and
        // re-raised behind the uniform boundary error; translation and
        // validation problems stay user-facing.
        self.run_pipeline(entity, args, payload, context)
            .await
            .map_err(PolyStoreError::mask_at_boundary)
    }

    async fn run_pipeline(
        &self,
        entity: &str,
        args: Value,
        mut payload: OperationPayload,
        context: Value,
    ) -> Result<Value, PolyStoreError> {
        let action = payload.action.clone().unwrap_or(Action::Find);
        let operation = action.as_str();
        let hooks = self.registry.hooks(entity);

        let bag = HookBag::new(args)
            .with_context(context)
            .with_filter(payload.filter.clone())
            .with_payload(payload.write.clone().map(Value::Object));

        // beforeResolver (veto point), then beforeQuery
        let bag = run_pre_dispatch(hooks, operation, bag).await?;

        // A hook may have rewritten the filter or the write payload
        payload.filter = bag.filter.clone();
        if let Some(Value::Object(write)) = &bag.payload {
            payload.write = Some(write.clone());
        }

        let result = Dispatcher::new(&self.registry)
            .dispatch(entity, &payload)
            .await?;

        let mut bag = bag;
        bag.result = Some(result.into_value());
        let bag = run_phase(hooks, operation, HookPhase::AfterQuery, bag).await?;
        let mut bag = run_phase(hooks, operation, HookPhase::AfterResolver, bag).await?;

        Ok(bag.take_result().unwrap_or(Value::Null))
    }

    /// Resolve a relation-bearing column for one parent row, re-entering the
    /// dispatcher against the foreign entity.
    pub async fn resolve_relation(
        &self,
        entity: &str,
        column: &str,
        parent: &Value,
        pagination: Pagination,
    ) -> Result<Value, PolyStoreError> {
        RelationResolver::new(&self.registry)
            .resolve(entity, column, parent, pagination)
            .await
    }
}
