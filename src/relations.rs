//! Relation resolver
//!
//! For a relation-bearing column, derives a filter from a parent row and
//! re-enters the dispatcher against the foreign entity, collapsing the
//! result to one row or a list per cardinality. Each parent row triggers one
//! independent dispatch; sibling rows are not batched.

use crate::dispatch::{Action, DispatchResult, Dispatcher, OperationPayload, Pagination};
use crate::entity::{Cardinality, Dialect};
use crate::errors::PolyStoreError;
use crate::pool::Registry;
use serde_json::{json, Value};

pub struct RelationResolver<'a> {
    registry: &'a Registry,
}

impl<'a> RelationResolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Resolve the relation on `entity.column` for one parent row.
    ///
    /// Returns a list for a `1:n` relation (`[]` on zero matches, never
    /// null) and a single row or `Value::Null` otherwise.
    pub async fn resolve(
        &self,
        entity: &str,
        column: &str,
        parent: &Value,
        pagination: Pagination,
    ) -> Result<Value, PolyStoreError> {
        let descriptor = self.registry.entity(entity)?;
        let relation = descriptor
            .column(column)
            .and_then(|c| c.relation.as_ref())
            .ok_or_else(|| {
                PolyStoreError::Validation(format!(
                    "column '{column}' on entity '{entity}' has no relation"
                ))
            })?;

        let key_value = self.parent_key(descriptor.primary_key(), column, relation.cardinality, parent);
        let foreign = self.registry.entity(&relation.foreign_entity)?;

        // Dialect-appropriate filter shape: the document translator expects
        // the equality wrapped in an AND combinator, the relational one a
        // flat equality.
        let foreign_key = relation.foreign_key.as_str();
        let condition = json!({ foreign_key: {"_eq": key_value} });
        let filter = match foreign.dialect {
            Dialect::Document => json!({ "_and": [condition] }),
            _ => condition,
        };

        let payload = OperationPayload {
            action: Some(Action::Find),
            filter: Some(filter),
            pagination,
            ..Default::default()
        };

        let result = Dispatcher::new(self.registry)
            .dispatch(&relation.foreign_entity, &payload)
            .await?;
        let rows = match result {
            DispatchResult::Rows(rows) => rows,
            _ => Vec::new(),
        };

        // The cardinality token's last character decides object vs list
        if relation.cardinality.is_many() {
            Ok(Value::Array(rows))
        } else {
            Ok(rows.into_iter().next().unwrap_or(Value::Null))
        }
    }

    /// The parent-side value the foreign key is equated to: for an `n:1`
    /// relation the parent row stores the key in the relation column itself;
    /// otherwise the parent's primary key is used.
    fn parent_key(
        &self,
        primary_key: &str,
        column: &str,
        cardinality: Cardinality,
        parent: &Value,
    ) -> Value {
        let field = match cardinality {
            Cardinality::ManyToOne => column,
            _ => primary_key,
        };

        parent
            .get(field)
            // Document rows carry the key under the store's internal name
            .or_else(|| if field == "id" { parent.get("_id") } else { None })
            .cloned()
            .unwrap_or(Value::Null)
    }
}
