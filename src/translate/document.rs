//! Document-dialect translator
//!
//! Purely recursive, order-preserving translation of the filter tree into a
//! document-store query object: `{_and: [...]}` becomes `{"$and": [...]}`,
//! conditions become `{field: {"$op": value}}`.

use crate::errors::TranslationError;
use crate::filter::{ComparisonOp, FilterNode, LogicalOp, SortOrder};
use serde_json::{json, Map, Value};

/// Internal primary-key field name of the document store.
pub const ID_FIELD: &str = "_id";

/// Translate a filter tree into a document query object. `None` translates
/// to the empty query (match everything).
pub fn translate(filter: Option<&FilterNode>) -> Result<Value, TranslationError> {
    match filter {
        None => Ok(Value::Object(Map::new())),
        Some(node) => translate_node(node),
    }
}

fn translate_node(node: &FilterNode) -> Result<Value, TranslationError> {
    match node {
        FilterNode::Combinator { op, children } => {
            let key = match op {
                LogicalOp::And => "$and",
                LogicalOp::Or => "$or",
            };
            let translated = children
                .iter()
                .map(translate_node)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(json!({ key: translated }))
        }
        FilterNode::Condition { field, op, value } => translate_condition(field, *op, value),
    }
}

fn translate_condition(
    field: &str,
    op: ComparisonOp,
    value: &Value,
) -> Result<Value, TranslationError> {
    // The logical "id" column maps to the store's internal primary key.
    let field = if field == "id" { ID_FIELD } else { field };

    let body = match op {
        ComparisonOp::Eq => json!({ "$eq": coerce_identifier(value) }),
        ComparisonOp::Neq => json!({ "$ne": coerce_identifier(value) }),
        ComparisonOp::Lt => json!({ "$lt": value }),
        ComparisonOp::Lte => json!({ "$lte": value }),
        ComparisonOp::Gt => json!({ "$gt": value }),
        ComparisonOp::Gte => json!({ "$gte": value }),
        ComparisonOp::Like => json!({ "$regex": value, "$options": "i" }),
        ComparisonOp::In => json!({ "$in": list_value(value) }),
        ComparisonOp::Nin => json!({ "$nin": list_value(value) }),
    };

    Ok(json!({ field: body }))
}

/// `eq`/`neq` string values in the store's native identifier format (24 hex
/// characters) are coerced to the identifier type before comparison.
fn coerce_identifier(value: &Value) -> Value {
    match value {
        Value::String(s) if is_object_id(s) => json!({ "$oid": s }),
        other => other.clone(),
    }
}

fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// `in`/`nin` accept either a list or a comma-delimited string, which is
/// split into trimmed strings.
fn list_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::Array(
            s.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Translate the sort map; ASC maps to 1, DESC to -1. With no explicit sort
/// the store orders ascending by primary key.
pub fn translate_sort(sort: &[(String, SortOrder)], primary_key: &str) -> Value {
    if sort.is_empty() {
        let key = if primary_key == "id" { ID_FIELD } else { primary_key };
        return json!({ key: 1 });
    }

    let mut out = Map::new();
    for (field, order) in sort {
        let field = if field == "id" { ID_FIELD } else { field.as_str() };
        let direction = match order {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        };
        out.insert(field.to_string(), json!(direction));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(wire: Value) -> FilterNode {
        FilterNode::from_wire(&wire).unwrap().unwrap()
    }

    #[test]
    fn and_combinator_maps_to_dollar_and() {
        let node = parse(json!({"_and": [{"status": {"_eq": "SHIPPED"}}]}));
        let query = translate(Some(&node)).unwrap();
        assert_eq!(query, json!({"$and": [{"status": {"$eq": "SHIPPED"}}]}));
    }

    #[test]
    fn or_combinator_preserves_child_order() {
        let node = FilterNode::or(vec![
            FilterNode::eq("a", json!(1)),
            FilterNode::eq("b", json!(2)),
        ]);
        let query = translate(Some(&node)).unwrap();
        assert_eq!(
            query,
            json!({"$or": [{"a": {"$eq": 1}}, {"b": {"$eq": 2}}]})
        );
    }

    #[test]
    fn id_field_is_rewritten_inside_subdocuments() {
        let node = parse(json!({"_and": [{"id": {"_eq": "plain-string"}}]}));
        let query = translate(Some(&node)).unwrap();
        assert_eq!(query, json!({"$and": [{"_id": {"$eq": "plain-string"}}]}));
    }

    #[test]
    fn object_id_strings_are_coerced() {
        let oid = "507f1f77bcf86cd799439011";
        let node = parse(json!({"id": {"_eq": oid}}));
        let query = translate(Some(&node)).unwrap();
        assert_eq!(query, json!({"_id": {"$eq": {"$oid": oid}}}));

        // 23 chars: compared as a plain string
        let short = "507f1f77bcf86cd79943901";
        let node = parse(json!({"ref": {"_neq": short}}));
        let query = translate(Some(&node)).unwrap();
        assert_eq!(query, json!({"ref": {"$ne": short}}));
    }

    #[test]
    fn in_splits_comma_delimited_strings() {
        let node = parse(json!({"status": {"_in": "OPEN, SHIPPED ,CLOSED"}}));
        let query = translate(Some(&node)).unwrap();
        assert_eq!(
            query,
            json!({"status": {"$in": ["OPEN", "SHIPPED", "CLOSED"]}})
        );
    }

    #[test]
    fn nin_passes_arrays_through() {
        let node = parse(json!({"status": {"_nin": ["VOID", "DRAFT"]}}));
        let query = translate(Some(&node)).unwrap();
        assert_eq!(query, json!({"status": {"$nin": ["VOID", "DRAFT"]}}));
    }

    #[test]
    fn like_is_a_case_insensitive_pattern() {
        let node = parse(json!({"name": {"_like": "smith"}}));
        let query = translate(Some(&node)).unwrap();
        assert_eq!(query, json!({"name": {"$regex": "smith", "$options": "i"}}));
    }

    #[test]
    fn empty_filter_translates_to_empty_query() {
        assert_eq!(translate(None).unwrap(), json!({}));
    }

    #[test]
    fn default_sort_is_ascending_by_primary_key() {
        assert_eq!(translate_sort(&[], "id"), json!({"_id": 1}));
        assert_eq!(translate_sort(&[], "sku"), json!({"sku": 1}));

        let explicit = vec![
            ("price".to_string(), SortOrder::Desc),
            ("id".to_string(), SortOrder::Asc),
        ];
        assert_eq!(
            translate_sort(&explicit, "id"),
            json!({"price": -1, "_id": 1})
        );
    }
}
