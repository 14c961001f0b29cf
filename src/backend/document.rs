//! Document-store backend
//!
//! An embedded document store evaluating the translated query objects
//! (`$and`/`$or` combinators, `$eq`/`$ne`/`$lt`/`$lte`/`$gt`/`$gte`/`$in`/
//! `$nin`/`$regex` conditions, `$oid` identifiers). Collections live behind
//! one shared handle; each entity binds to its own collection.

use super::{BackendConnection, BackendError, NativeQuery};
use crate::entity::Dialect;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Server-side cap on find/count queries, matching the document store's
/// fixed 60-second execution limit.
const MAX_QUERY_TIME: Duration = Duration::from_secs(60);

/// Shared in-process document store
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Value>>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Document backend client bound to one collection
pub struct DocumentConnection {
    store: DocumentStore,
    collection: String,
    storage: Option<Arc<dyn super::ObjectStorage>>,
}

impl DocumentConnection {
    pub fn new(
        store: DocumentStore,
        collection: &str,
        storage: Option<Arc<dyn super::ObjectStorage>>,
    ) -> Self {
        Self {
            store,
            collection: collection.to_string(),
            storage,
        }
    }

    fn query<'q>(&self, query: &'q NativeQuery) -> Result<&'q super::DocumentQuery, BackendError> {
        match query {
            NativeQuery::Document(q) => Ok(q),
            NativeQuery::Sql(_) => Err(BackendError::DialectMismatch {
                expected: "document",
            }),
        }
    }

    async fn select(&self, query: &super::DocumentQuery) -> Vec<Value> {
        let collections = self.store.collections.read().await;
        let docs = collections.get(&self.collection);

        let mut matched: Vec<Value> = docs
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(&query.filter, doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_documents(&mut matched, &query.sort);

        let skip = query.skip.unwrap_or(0) as usize;
        let matched: Vec<Value> = matched.into_iter().skip(skip).collect();
        match query.take {
            Some(take) => matched.into_iter().take(take as usize).collect(),
            None => matched,
        }
    }
}

#[async_trait]
impl BackendConnection for DocumentConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Document
    }

    async fn find(&self, query: &NativeQuery) -> Result<Vec<Value>, BackendError> {
        let query = self.query(query)?;
        tokio::time::timeout(MAX_QUERY_TIME, self.select(query))
            .await
            .map_err(|_| BackendError::Connection("query exceeded 60s execution cap".into()))
    }

    async fn count(&self, query: &NativeQuery) -> Result<i64, BackendError> {
        let query = self.query(query)?;
        let counted = tokio::time::timeout(MAX_QUERY_TIME, async {
            let collections = self.store.collections.read().await;
            collections
                .get(&self.collection)
                .map(|docs| docs.iter().filter(|doc| matches(&query.filter, doc)).count())
                .unwrap_or(0)
        })
        .await
        .map_err(|_| BackendError::Connection("query exceeded 60s execution cap".into()))?;
        Ok(counted as i64)
    }

    async fn create(&self, mut row: Map<String, Value>) -> Result<Value, BackendError> {
        // Store under the internal primary-key field
        if let Some(id) = row.remove("id") {
            row.insert("_id".to_string(), id);
        }
        if !row.contains_key("_id") {
            row.insert("_id".to_string(), Value::String(generate_object_id()));
        }

        let document = Value::Object(row);
        let mut collections = self.store.collections.write().await;
        collections
            .entry(self.collection.clone())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn update(
        &self,
        query: &NativeQuery,
        fields: Map<String, Value>,
    ) -> Result<Vec<Value>, BackendError> {
        let query = self.query(query)?;
        let mut collections = self.store.collections.write().await;
        let Some(docs) = collections.get_mut(&self.collection) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for doc in docs.iter_mut() {
            if !matches(&query.filter, doc) {
                continue;
            }
            if let Value::Object(map) = doc {
                for (key, value) in &fields {
                    let key = if key == "id" { "_id" } else { key.as_str() };
                    map.insert(key.to_string(), value.clone());
                }
            }
            updated.push(doc.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, query: &NativeQuery) -> Result<u64, BackendError> {
        let query = self.query(query)?;
        let mut collections = self.store.collections.write().await;
        let Some(docs) = collections.get_mut(&self.collection) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|doc| !matches(&query.filter, doc));
        Ok((before - docs.len()) as u64)
    }

    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, BackendError> {
        match &self.storage {
            Some(storage) => storage.put(name, bytes).await,
            None => Err(BackendError::Unsupported {
                operation: "upload",
                dialect: "document",
            }),
        }
    }
}

fn generate_object_id() -> String {
    // 24 hex chars, the store's native identifier format
    uuid::Uuid::new_v4().simple().to_string()[..24].to_string()
}

/// Evaluate a translated query object against one document.
fn matches(query: &Value, doc: &Value) -> bool {
    let Value::Object(entries) = query else {
        return false;
    };

    entries.iter().all(|(key, expected)| match key.as_str() {
        "$and" => expected
            .as_array()
            .is_some_and(|children| children.iter().all(|child| matches(child, doc))),
        "$or" => expected
            .as_array()
            .is_some_and(|children| children.iter().any(|child| matches(child, doc))),
        field => field_matches(doc.get(field).unwrap_or(&Value::Null), expected),
    })
}

fn field_matches(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Object(ops) if is_operator_object(ops) => ops
            .iter()
            .all(|(op, rhs)| operator_matches(actual, op, rhs)),
        other => scalar_eq(actual, other),
    }
}

fn is_operator_object(ops: &Map<String, Value>) -> bool {
    !ops.contains_key("$oid") && ops.keys().any(|k| k.starts_with('$'))
}

fn operator_matches(actual: &Value, op: &str, rhs: &Value) -> bool {
    match op {
        "$eq" => scalar_eq(actual, rhs),
        "$ne" => !scalar_eq(actual, rhs),
        "$lt" => compare(actual, rhs) == Some(Ordering::Less),
        "$lte" => matches!(compare(actual, rhs), Some(Ordering::Less | Ordering::Equal)),
        "$gt" => compare(actual, rhs) == Some(Ordering::Greater),
        "$gte" => matches!(
            compare(actual, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "$in" => rhs
            .as_array()
            .is_some_and(|values| values.iter().any(|v| scalar_eq(actual, v))),
        "$nin" => rhs
            .as_array()
            .is_some_and(|values| !values.iter().any(|v| scalar_eq(actual, v))),
        "$regex" => match (actual.as_str(), rhs.as_str()) {
            // Case-insensitive substring match
            (Some(haystack), Some(needle)) => haystack
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => false,
        },
        // Modifier consumed together with $regex
        "$options" => true,
        _ => false,
    }
}

/// Identifier-aware equality: `{"$oid": s}` compares equal to the bare
/// string and to another `$oid` wrapper.
fn scalar_eq(a: &Value, b: &Value) -> bool {
    let a = unwrap_oid(a);
    let b = unwrap_oid(b);
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (x, y) => x == y,
    }
}

fn unwrap_oid(value: &Value) -> &Value {
    if let Value::Object(map) = value {
        if map.len() == 1 {
            if let Some(inner) = map.get("$oid") {
                return inner;
            }
        }
    }
    value
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn sort_documents(docs: &mut [Value], sort: &Value) {
    let Value::Object(spec) = sort else {
        return;
    };
    if spec.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for (field, direction) in spec {
            let lhs = a.get(field).unwrap_or(&Value::Null);
            let rhs = b.get(field).unwrap_or(&Value::Null);
            let ordering = compare(lhs, rhs).unwrap_or(Ordering::Equal);
            let ordering = if direction.as_i64() == Some(-1) {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(filter: Value) -> NativeQuery {
        NativeQuery::Document(super::super::DocumentQuery {
            filter,
            sort: json!({"_id": 1}),
            skip: None,
            take: None,
        })
    }

    fn connection() -> DocumentConnection {
        DocumentConnection::new(DocumentStore::new(), "orders", None)
    }

    #[tokio::test]
    async fn create_then_find_by_equality() {
        let conn = connection();
        conn.create(json!({"status": "SHIPPED", "price": 12}).as_object().unwrap().clone())
            .await
            .unwrap();
        conn.create(json!({"status": "OPEN", "price": 3}).as_object().unwrap().clone())
            .await
            .unwrap();

        let found = conn
            .find(&query(json!({"$and": [{"status": {"$eq": "SHIPPED"}}]})))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["price"], json!(12));
        // Generated identifier is in the store's native format
        assert_eq!(found[0]["_id"].as_str().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn range_and_or_evaluation() {
        let conn = connection();
        for price in [5, 15, 25, 60] {
            conn.create(json!({"price": price}).as_object().unwrap().clone())
                .await
                .unwrap();
        }

        let found = conn
            .find(&query(
                json!({"$or": [{"price": {"$lt": 10}}, {"price": {"$gte": 60}}]}),
            ))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let count = conn
            .count(&query(json!({"price": {"$gt": 10, "$lte": 50}})))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn regex_is_case_insensitive_substring() {
        let conn = connection();
        conn.create(json!({"name": "Alice Smith"}).as_object().unwrap().clone())
            .await
            .unwrap();

        let found = conn
            .find(&query(json!({"name": {"$regex": "sMiTh", "$options": "i"}})))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn oid_values_compare_against_stored_strings() {
        let conn = connection();
        let oid = "507f1f77bcf86cd799439011";
        conn.create(json!({"id": oid, "n": 1}).as_object().unwrap().clone())
            .await
            .unwrap();

        let found = conn
            .find(&query(json!({"_id": {"$eq": {"$oid": oid}}})))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_by_filter() {
        let conn = connection();
        conn.create(json!({"status": "OPEN"}).as_object().unwrap().clone())
            .await
            .unwrap();
        conn.create(json!({"status": "OPEN"}).as_object().unwrap().clone())
            .await
            .unwrap();

        let updated = conn
            .update(
                &query(json!({"status": {"$eq": "OPEN"}})),
                json!({"status": "CLOSED"}).as_object().unwrap().clone(),
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|doc| doc["status"] == json!("CLOSED")));

        let deleted = conn
            .delete(&query(json!({"status": {"$eq": "CLOSED"}})))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(conn.count(&query(json!({}))).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sort_skip_take_apply_in_order() {
        let conn = connection();
        for price in [30, 10, 20, 40] {
            conn.create(json!({"price": price}).as_object().unwrap().clone())
                .await
                .unwrap();
        }

        let q = NativeQuery::Document(super::super::DocumentQuery {
            filter: json!({}),
            sort: json!({"price": -1}),
            skip: Some(1),
            take: Some(2),
        });
        let found = conn.find(&q).await.unwrap();
        let prices: Vec<_> = found.iter().map(|d| d["price"].clone()).collect();
        assert_eq!(prices, vec![json!(30), json!(20)]);
    }
}
