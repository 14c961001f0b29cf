//! CRUD dispatcher
//!
//! Routes a normalized operation payload to the right backend connection:
//! resolve the entity descriptor, translate the filter for its dialect
//! (before any pool lookup), then invoke the matching backend method.
//!
//! The action is an explicit tag on the payload; the one-time translation
//! from the wire format's reserved-key shape happens in
//! [`OperationPayload::from_wire`] at the boundary, never inside the core.

use crate::backend::{DocumentQuery, NativeQuery, SqlQuery};
use crate::entity::{Dialect, EntityDescriptor};
use crate::errors::PolyStoreError;
use crate::filter::{FilterNode, SortOrder};
use crate::pool::Registry;
use crate::translate::{document, relational};
use serde_json::{json, Map, Value};

/// Reserved marker for action-discriminating wire keys.
const ACTION_MARKER: char = '_';

/// Normalized operation discriminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Find,
    Count,
    Create,
    Update,
    Delete,
    Upload,
    /// A reserved wire key that names no known action. Dispatching it yields
    /// the "action not defined" sentinel, not an error.
    Undefined(String),
}

impl Action {
    /// Lowercase operation name used for hook resolution.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Find => "find",
            Action::Count => "count",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Upload => "upload",
            Action::Undefined(_) => "undefined",
        }
    }
}

/// Pagination window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

/// Upload request: the blob plus the column receiving its location
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Column the completed object location is written to.
    pub location_column: String,
}

/// One normalized request against one entity
#[derive(Debug, Clone, Default)]
pub struct OperationPayload {
    pub action: Option<Action>,
    /// Filter in wire form; hooks may rewrite it before translation.
    pub filter: Option<Value>,
    /// Create/update field map.
    pub write: Option<Map<String, Value>>,
    pub upload: Option<UploadRequest>,
    pub pagination: Pagination,
    pub sort: Vec<(String, SortOrder)>,
}

impl OperationPayload {
    pub fn find(filter: Option<Value>) -> Self {
        Self {
            action: Some(Action::Find),
            filter,
            ..Default::default()
        }
    }

    /// Boundary translation from the wire format.
    ///
    /// Top-level keys carrying the reserved `_` marker select the action.
    /// When several known marker keys are present, a fixed precedence list
    /// (create, update, delete, upload) picks one deterministically; the
    /// legacy design left this iteration-order-dependent. No marker key
    /// means implicit Find; an unrecognized marker key maps to
    /// [`Action::Undefined`].
    pub fn from_wire(wire: &Value) -> Result<Self, PolyStoreError> {
        let Value::Object(map) = wire else {
            return Err(PolyStoreError::Validation(
                "operation payload must be an object".to_string(),
            ));
        };

        let mut payload = Self {
            action: Some(Action::Find),
            filter: map.get("filter").cloned(),
            pagination: Pagination {
                skip: read_index(map, "skip")?,
                take: read_index(map, "take")?,
            },
            sort: read_sort(map)?,
            ..Default::default()
        };

        let reserved: Vec<&String> = map
            .keys()
            .filter(|key| key.starts_with(ACTION_MARKER))
            .collect();
        if reserved.is_empty() {
            return Ok(payload);
        }

        // Fixed precedence among known action keys
        for key in ["_create", "_update", "_delete", "_upload"] {
            if let Some(body) = map.get(key) {
                match key {
                    "_create" => payload.read_create(body)?,
                    "_update" => payload.read_update(body)?,
                    "_delete" => payload.read_delete(body)?,
                    _ => payload.read_upload(body)?,
                }
                return Ok(payload);
            }
        }

        // Reserved keys present, none of them known; sorted map order makes
        // the reported key deterministic.
        payload.action = Some(Action::Undefined(reserved[0].clone()));
        Ok(payload)
    }

    fn read_create(&mut self, body: &Value) -> Result<(), PolyStoreError> {
        let fields = object_body(body, "_create")?;
        self.action = Some(Action::Create);
        self.write = Some(fields);
        Ok(())
    }

    fn read_update(&mut self, body: &Value) -> Result<(), PolyStoreError> {
        let mut fields = object_body(body, "_update")?;
        if let Some(filter) = fields.remove("filter") {
            self.filter = Some(filter);
        }
        self.action = Some(Action::Update);
        self.write = Some(fields);
        Ok(())
    }

    fn read_delete(&mut self, body: &Value) -> Result<(), PolyStoreError> {
        let mut fields = object_body(body, "_delete")?;
        if let Some(filter) = fields.remove("filter") {
            self.filter = Some(filter);
        }
        self.action = Some(Action::Delete);
        Ok(())
    }

    fn read_upload(&mut self, body: &Value) -> Result<(), PolyStoreError> {
        let mut fields = object_body(body, "_upload")?;
        if let Some(filter) = fields.remove("filter") {
            self.filter = Some(filter);
        }

        let file_name = fields
            .get("file")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PolyStoreError::Validation("_upload requires a 'file' name".to_string())
            })?
            .to_string();
        let bytes = fields
            .get("content")
            .and_then(Value::as_str)
            .map(|s| s.as_bytes().to_vec())
            .unwrap_or_default();
        let location_column = fields
            .get("location")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PolyStoreError::Validation("_upload requires a 'location' column".to_string())
            })?
            .to_string();

        self.action = Some(Action::Upload);
        self.upload = Some(UploadRequest {
            file_name,
            bytes,
            location_column,
        });
        Ok(())
    }
}

fn object_body(body: &Value, key: &str) -> Result<Map<String, Value>, PolyStoreError> {
    body.as_object()
        .cloned()
        .ok_or_else(|| PolyStoreError::Validation(format!("{key} payload must be an object")))
}

fn read_index(map: &Map<String, Value>, key: &str) -> Result<Option<u64>, PolyStoreError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| PolyStoreError::Validation(format!("{key} must be a non-negative integer"))),
    }
}

fn read_sort(map: &Map<String, Value>) -> Result<Vec<(String, SortOrder)>, PolyStoreError> {
    let Some(sort) = map.get("sort") else {
        return Ok(Vec::new());
    };
    let Value::Object(entries) = sort else {
        return Err(PolyStoreError::Validation(
            "sort must be a map of field to ASC/DESC".to_string(),
        ));
    };

    let mut out = Vec::with_capacity(entries.len());
    for (field, direction) in entries {
        let direction = direction.as_str().ok_or_else(|| {
            PolyStoreError::Validation(format!("sort direction for '{field}' must be a string"))
        })?;
        out.push((field.clone(), SortOrder::parse(direction)?));
    }
    Ok(out)
}

/// Result of one dispatched operation
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Rows(Vec<Value>),
    Count(i64),
    Created(Vec<Value>),
    Updated(Vec<Value>),
    Deleted(u64),
    Uploaded(String),
    /// Sentinel for an unrecognized action; not an error.
    ActionNotDefined,
}

impl DispatchResult {
    pub fn into_value(self) -> Value {
        match self {
            DispatchResult::Rows(rows) => Value::Array(rows),
            DispatchResult::Count(n) => json!(n),
            DispatchResult::Created(rows) => json!({ "created": rows }),
            DispatchResult::Updated(rows) => json!({ "updated": rows }),
            DispatchResult::Deleted(n) => json!({ "deleted": n }),
            DispatchResult::Uploaded(location) => json!({ "uploaded": location }),
            DispatchResult::ActionNotDefined => json!("action not defined"),
        }
    }
}

/// Routes one operation to the right backend connection
pub struct Dispatcher<'a> {
    registry: &'a Registry,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub async fn dispatch(
        &self,
        entity: &str,
        payload: &OperationPayload,
    ) -> Result<DispatchResult, PolyStoreError> {
        let action = payload.action.clone().unwrap_or(Action::Find);
        tracing::debug!(entity, action = action.as_str(), "dispatching operation");

        match action {
            Action::Undefined(key) => {
                tracing::warn!(entity, key = %key, "unrecognized action key");
                Ok(DispatchResult::ActionNotDefined)
            }
            Action::Find => {
                let descriptor = self.registry.entity(entity)?;
                let query = build_query(descriptor, payload)?;
                let entry = self.registry.entry(entity)?;
                Ok(DispatchResult::Rows(entry.connection.find(&query).await?))
            }
            Action::Count => {
                let descriptor = self.registry.entity(entity)?;
                let query = build_query(descriptor, payload)?;
                let entry = self.registry.entry(entity)?;
                Ok(DispatchResult::Count(entry.connection.count(&query).await?))
            }
            Action::Create => {
                let descriptor = self.registry.entity(entity)?;
                let fields = payload.write.clone().ok_or_else(|| {
                    PolyStoreError::Validation("create requires a field map".to_string())
                })?;
                validate_write(descriptor, &fields, true)?;
                let entry = self.registry.entry(entity)?;
                let row = entry.connection.create(fields).await?;
                Ok(DispatchResult::Created(vec![row]))
            }
            Action::Update => {
                let descriptor = self.registry.entity(entity)?;
                let query = build_destructive_query(descriptor, payload)?;
                let fields = payload.write.clone().ok_or_else(|| {
                    PolyStoreError::Validation("update requires a field map".to_string())
                })?;
                validate_write(descriptor, &fields, false)?;
                let entry = self.registry.entry(entity)?;
                let rows = entry.connection.update(&query, fields).await?;
                Ok(DispatchResult::Updated(rows))
            }
            Action::Delete => {
                let descriptor = self.registry.entity(entity)?;
                let query = build_destructive_query(descriptor, payload)?;
                let entry = self.registry.entry(entity)?;
                Ok(DispatchResult::Deleted(entry.connection.delete(&query).await?))
            }
            Action::Upload => {
                let upload = payload.upload.clone().ok_or_else(|| {
                    PolyStoreError::Validation("upload requires a file payload".to_string())
                })?;
                let descriptor = self.registry.entity(entity)?;
                if !descriptor.columns.is_empty()
                    && descriptor.column(&upload.location_column).is_none()
                {
                    return Err(PolyStoreError::Validation(format!(
                        "unknown location column '{}' on entity '{}'",
                        upload.location_column, entity
                    )));
                }

                let entry = self.registry.entry(entity)?;
                let location = entry
                    .connection
                    .upload(&upload.file_name, &upload.bytes)
                    .await?;

                // Record the completed location. A failure here leaves the
                // object store and the record store inconsistent; there is no
                // cross-store transaction to roll back.
                if payload.filter.is_some() {
                    let mut write = Map::new();
                    write.insert(upload.location_column.clone(), json!(location));
                    let update = OperationPayload {
                        action: Some(Action::Update),
                        filter: payload.filter.clone(),
                        write: Some(write),
                        ..Default::default()
                    };
                    Box::pin(self.dispatch(entity, &update)).await?;
                }

                Ok(DispatchResult::Uploaded(location))
            }
        }
    }
}

/// Translate the payload's filter, sort and pagination for the entity's
/// dialect. Translation happens before any connection-pool lookup.
fn build_query(
    descriptor: &EntityDescriptor,
    payload: &OperationPayload,
) -> Result<NativeQuery, PolyStoreError> {
    let filter = FilterNode::from_wire(payload.filter.as_ref().unwrap_or(&Value::Null))?;
    if let Some(filter) = &filter {
        validate_filter(descriptor, filter)?;
    }
    translate_for_dialect(descriptor, payload, filter.as_ref())
}

/// Like [`build_query`], but rejects an empty resolved filter: a delete or
/// update must never silently touch everything. Empty combinators collapse
/// away during parsing, so `{_and: []}` resolves empty and is rejected here
/// like a missing filter.
fn build_destructive_query(
    descriptor: &EntityDescriptor,
    payload: &OperationPayload,
) -> Result<NativeQuery, PolyStoreError> {
    let filter = FilterNode::from_wire(payload.filter.as_ref().unwrap_or(&Value::Null))?;
    let Some(filter) = filter else {
        return Err(PolyStoreError::Validation(
            "update/delete requires a non-empty filter".to_string(),
        ));
    };
    validate_filter(descriptor, &filter)?;
    translate_for_dialect(descriptor, payload, Some(&filter))
}

/// Filter field names must name declared columns, mirroring the write-path
/// check: condition fields are interpolated into store-native queries, so an
/// undeclared name must never reach a translator. Entities configured
/// without a column schema accept any field.
fn validate_filter(
    descriptor: &EntityDescriptor,
    filter: &FilterNode,
) -> Result<(), PolyStoreError> {
    if descriptor.columns.is_empty() {
        return Ok(());
    }

    match filter {
        FilterNode::Combinator { children, .. } => {
            for child in children {
                validate_filter(descriptor, child)?;
            }
            Ok(())
        }
        FilterNode::Condition { field, .. } => {
            if descriptor.column(field).is_none() {
                return Err(PolyStoreError::Validation(format!(
                    "unknown column '{}' on entity '{}'",
                    field, descriptor.name
                )));
            }
            Ok(())
        }
    }
}

fn translate_for_dialect(
    descriptor: &EntityDescriptor,
    payload: &OperationPayload,
    filter: Option<&FilterNode>,
) -> Result<NativeQuery, PolyStoreError> {
    match descriptor.dialect {
        Dialect::Document | Dialect::ObjectStore => Ok(NativeQuery::Document(DocumentQuery {
            filter: document::translate(filter)?,
            sort: document::translate_sort(&payload.sort, descriptor.primary_key()),
            skip: payload.pagination.skip,
            take: payload.pagination.take,
        })),
        Dialect::Relational => Ok(NativeQuery::Sql(SqlQuery {
            filter: relational::translate(filter)?,
            order_by: relational::render_order_by(&payload.sort),
            limit: relational::render_limit(payload.pagination.skip, payload.pagination.take),
        })),
    }
}

fn validate_write(
    descriptor: &EntityDescriptor,
    fields: &Map<String, Value>,
    is_create: bool,
) -> Result<(), PolyStoreError> {
    // Entities configured without a column schema accept any shape
    if descriptor.columns.is_empty() {
        return Ok(());
    }

    for field in fields.keys() {
        if descriptor.column(field).is_none() {
            return Err(PolyStoreError::Validation(format!(
                "unknown column '{}' on entity '{}'",
                field, descriptor.name
            )));
        }
    }

    if is_create {
        for column in &descriptor.columns {
            let exempt = column.nullable || column.primary_key || column.relation.is_some();
            if !exempt && !fields.contains_key(&column.name) {
                return Err(PolyStoreError::Validation(format!(
                    "missing non-nullable column '{}' on entity '{}'",
                    column.name, descriptor.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ColumnDescriptor, ScalarKind};

    fn descriptor(dialect: Dialect, columns: &[&str]) -> EntityDescriptor {
        EntityDescriptor {
            name: "orders".into(),
            dialect,
            columns: columns
                .iter()
                .map(|name| ColumnDescriptor {
                    name: name.to_string(),
                    kind: ScalarKind::String,
                    nullable: true,
                    primary_key: false,
                    relation: None,
                })
                .collect(),
            metadata: None,
        }
    }

    #[test]
    fn payload_without_reserved_key_is_implicit_find() {
        let payload = OperationPayload::from_wire(&json!({"filter": {}})).unwrap();
        assert_eq!(payload.action, Some(Action::Find));
        assert_eq!(payload.filter, Some(json!({})));
    }

    #[test]
    fn unrecognized_reserved_key_maps_to_undefined() {
        let payload = OperationPayload::from_wire(&json!({"_frobnicate": {}})).unwrap();
        assert_eq!(
            payload.action,
            Some(Action::Undefined("_frobnicate".to_string()))
        );
    }

    #[test]
    fn multiple_reserved_keys_use_fixed_precedence() {
        let payload = OperationPayload::from_wire(&json!({
            "_delete": {"filter": {"id": 1}},
            "_create": {"name": "x"},
        }))
        .unwrap();
        assert_eq!(payload.action, Some(Action::Create));
    }

    #[test]
    fn update_body_carries_filter_and_fields() {
        let payload = OperationPayload::from_wire(&json!({
            "_update": {"filter": {"id": {"_eq": 7}}, "status": "CLOSED"}
        }))
        .unwrap();
        assert_eq!(payload.action, Some(Action::Update));
        assert_eq!(payload.filter, Some(json!({"id": {"_eq": 7}})));
        assert_eq!(
            payload.write.unwrap().get("status"),
            Some(&json!("CLOSED"))
        );
    }

    #[test]
    fn pagination_and_sort_are_parsed() {
        let payload = OperationPayload::from_wire(&json!({
            "skip": 20, "take": 5, "sort": {"price": "DESC"}
        }))
        .unwrap();
        assert_eq!(payload.pagination, Pagination { skip: Some(20), take: Some(5) });
        assert_eq!(payload.sort, vec![("price".to_string(), SortOrder::Desc)]);

        let err = OperationPayload::from_wire(&json!({"skip": -1})).unwrap_err();
        assert!(matches!(err, PolyStoreError::Validation(_)));
    }

    #[test]
    fn upload_body_requires_file_and_location() {
        let payload = OperationPayload::from_wire(&json!({
            "_upload": {"file": "a.pdf", "content": "data", "location": "url",
                        "filter": {"id": 1}}
        }))
        .unwrap();
        let upload = payload.upload.unwrap();
        assert_eq!(upload.file_name, "a.pdf");
        assert_eq!(upload.location_column, "url");

        let err = OperationPayload::from_wire(&json!({"_upload": {"file": "a.pdf"}}))
            .unwrap_err();
        assert!(matches!(err, PolyStoreError::Validation(_)));
    }

    #[test]
    fn empty_combinator_filter_is_rejected_for_destructive_ops() {
        // {_and: []} and {_and: [{}]} resolve to no filter at all; letting
        // them through would delete or update every row in either dialect
        for dialect in [Dialect::Document, Dialect::Relational] {
            let descriptor = descriptor(dialect, &[]);
            for filter in [
                json!({"_and": []}),
                json!({"_and": [{}]}),
                json!({"_and": [{"_or": []}]}),
            ] {
                let payload = OperationPayload {
                    action: Some(Action::Delete),
                    filter: Some(filter),
                    ..Default::default()
                };
                let err = build_destructive_query(&descriptor, &payload).unwrap_err();
                assert!(matches!(err, PolyStoreError::Validation(_)));
            }
        }
    }

    #[test]
    fn filter_fields_must_name_declared_columns() {
        let described = descriptor(Dialect::Relational, &["status"]);
        let payload = OperationPayload::find(Some(json!({"status; DROP": {"_eq": "x"}})));
        let err = build_query(&described, &payload).unwrap_err();
        assert!(matches!(err, PolyStoreError::Validation(_)));

        let payload = OperationPayload::find(Some(json!({"status": {"_eq": "OPEN"}})));
        assert!(build_query(&described, &payload).is_ok());

        // No column schema means no field check, as on the write path
        let schemaless = descriptor(Dialect::Document, &[]);
        let payload = OperationPayload::find(Some(json!({"anything": 1})));
        assert!(build_query(&schemaless, &payload).is_ok());
    }

    #[test]
    fn result_shapes() {
        assert_eq!(
            DispatchResult::Created(vec![json!({"a": 1})]).into_value(),
            json!({"created": [{"a": 1}]})
        );
        assert_eq!(DispatchResult::Deleted(3).into_value(), json!({"deleted": 3}));
        assert_eq!(DispatchResult::Count(7).into_value(), json!(7));
        assert_eq!(
            DispatchResult::ActionNotDefined.into_value(),
            json!("action not defined")
        );
    }
}
