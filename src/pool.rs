//! Entity registry and connection pool manager
//!
//! At boot, every configured entity is validated and bound to one live
//! backend connection keyed by its name and dialect. The registry is
//! read-only for the lifetime of the process; lookups are O(1). An entity
//! whose dialect has no connection branch is a fatal startup error, never a
//! first-request surprise.

use crate::backend::{
    BackendConnection, DocumentConnection, DocumentStore, FsObjectStorage, ObjectStorage,
    ObjectStoreConnection, RelationalConnection,
};
use crate::entity::{ColumnDescriptor, Dialect, EntityDescriptor};
use crate::errors::PolyStoreError;
use config::AppConfig;
use hook_system::HookSet;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Boot-time binding between an entity and its backend connection
pub struct PoolEntry {
    pub name: String,
    pub dialect: Dialect,
    pub connection: Arc<dyn BackendConnection>,
    /// Column snapshot copied from the descriptor at boot; not re-read.
    pub columns: Vec<ColumnDescriptor>,
}

impl std::fmt::Debug for PoolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolEntry")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Process-wide registry of entities, pool entries and hook sets
pub struct Registry {
    entities: HashMap<String, EntityDescriptor>,
    entries: HashMap<String, PoolEntry>,
    hooks: HashMap<String, HookSet>,
    empty_hooks: HookSet,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entities.keys().collect::<Vec<_>>())
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Validate the configuration and open one pool entry per entity.
    pub async fn open(config: &AppConfig) -> Result<Self, PolyStoreError> {
        let mut entities = HashMap::new();
        for entity_config in &config.entities {
            let descriptor = EntityDescriptor::from_config(entity_config)?;
            if entities
                .insert(descriptor.name.clone(), descriptor)
                .is_some()
            {
                return Err(PolyStoreError::Configuration(format!(
                    "duplicate entity name '{}'",
                    entity_config.name
                )));
            }
        }

        // Every relation must point at a registered entity
        for descriptor in entities.values() {
            for column in &descriptor.columns {
                if let Some(relation) = &column.relation {
                    if !entities.contains_key(&relation.foreign_entity) {
                        return Err(PolyStoreError::Configuration(format!(
                            "relation on '{}.{}' references unknown entity '{}'",
                            descriptor.name, column.name, relation.foreign_entity
                        )));
                    }
                }
            }
        }

        let storage: Option<Arc<dyn ObjectStorage>> = config
            .object_store
            .as_ref()
            .map(|os| Arc::new(FsObjectStorage::new(os.root_dir.clone())) as Arc<dyn ObjectStorage>);

        let needs_database = entities
            .values()
            .any(|descriptor| descriptor.dialect == Dialect::Relational);
        let pg_pool = if needs_database {
            let database = config.database.as_ref().ok_or_else(|| {
                PolyStoreError::Configuration(
                    "relational entities configured but [database] section is missing".to_string(),
                )
            })?;
            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    PolyStoreError::Configuration(format!("cannot open database pool: {e}"))
                })?;
            Some(pool)
        } else {
            None
        };

        let document_store = DocumentStore::new();

        let mut entries = HashMap::new();
        for descriptor in entities.values() {
            let connection: Arc<dyn BackendConnection> = match descriptor.dialect {
                Dialect::Document => Arc::new(DocumentConnection::new(
                    document_store.clone(),
                    &descriptor.name,
                    storage.clone(),
                )),
                Dialect::Relational => {
                    // Checked above; the pool exists when any relational entity does
                    let pool = pg_pool.clone().ok_or_else(|| {
                        PolyStoreError::Configuration("database pool unavailable".to_string())
                    })?;
                    Arc::new(RelationalConnection::new(
                        pool,
                        &descriptor.name,
                        storage.clone(),
                    ))
                }
                Dialect::ObjectStore => {
                    let storage = storage.clone().ok_or_else(|| {
                        PolyStoreError::Configuration(format!(
                            "entity '{}' uses the object_store dialect but [object_store] is not configured",
                            descriptor.name
                        ))
                    })?;
                    Arc::new(ObjectStoreConnection::new(storage))
                }
            };

            tracing::debug!(entity = %descriptor.name, dialect = descriptor.dialect.as_str(), "opened pool entry");
            entries.insert(
                descriptor.name.clone(),
                PoolEntry {
                    name: descriptor.name.clone(),
                    dialect: descriptor.dialect,
                    connection,
                    columns: descriptor.columns.clone(),
                },
            );
        }

        Ok(Self {
            entities,
            entries,
            hooks: HashMap::new(),
            empty_hooks: HookSet::new(),
        })
    }

    pub fn entity(&self, name: &str) -> Result<&EntityDescriptor, PolyStoreError> {
        self.entities
            .get(name)
            .ok_or_else(|| PolyStoreError::UnknownEntity(name.to_string()))
    }

    pub fn entry(&self, name: &str) -> Result<&PoolEntry, PolyStoreError> {
        self.entries
            .get(name)
            .ok_or_else(|| PolyStoreError::UnknownEntity(name.to_string()))
    }

    /// Hooks for one entity; entities without declarations get the empty set.
    pub fn hooks(&self, name: &str) -> &HookSet {
        self.hooks.get(name).unwrap_or(&self.empty_hooks)
    }

    /// Register hooks for an entity. Must happen before serving; the
    /// registry is read-only afterwards.
    pub fn register_hooks(&mut self, name: &str, hooks: HookSet) -> Result<(), PolyStoreError> {
        if !self.entities.contains_key(name) {
            return Err(PolyStoreError::UnknownEntity(name.to_string()));
        }
        self.hooks.insert(name.to_string(), hooks);
        Ok(())
    }

    pub fn entity_names(&self) -> Vec<&String> {
        self.entities.keys().collect()
    }
}
