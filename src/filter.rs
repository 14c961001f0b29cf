//! Backend-agnostic filter tree
//!
//! This module defines the filter DSL shared by every dialect: a recursive
//! tree of logical combinators (AND/OR) and leaf comparison conditions, plus
//! the parser from the wire form (`{_and: [...]}`, `{field: {_eq: v}}`).
//!
//! Operator/dialect compatibility is deliberately not checked here; the
//! translators check it when the tree is rendered for a concrete store.

use crate::errors::TranslationError;
use serde_json::Value;

/// Logical combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Leaf comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    In,
    Nin,
}

impl ComparisonOp {
    pub fn parse(key: &str) -> Result<Self, TranslationError> {
        match key {
            "_eq" => Ok(ComparisonOp::Eq),
            "_neq" => Ok(ComparisonOp::Neq),
            "_lt" => Ok(ComparisonOp::Lt),
            "_lte" => Ok(ComparisonOp::Lte),
            "_gt" => Ok(ComparisonOp::Gt),
            "_gte" => Ok(ComparisonOp::Gte),
            "_like" => Ok(ComparisonOp::Like),
            "_in" => Ok(ComparisonOp::In),
            "_nin" => Ok(ComparisonOp::Nin),
            other => Err(TranslationError::UnknownOperator(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "_eq",
            ComparisonOp::Neq => "_neq",
            ComparisonOp::Lt => "_lt",
            ComparisonOp::Lte => "_lte",
            ComparisonOp::Gt => "_gt",
            ComparisonOp::Gte => "_gte",
            ComparisonOp::Like => "_like",
            ComparisonOp::In => "_in",
            ComparisonOp::Nin => "_nin",
        }
    }
}

/// Recursive filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Combinator {
        op: LogicalOp,
        children: Vec<FilterNode>,
    },
    Condition {
        field: String,
        op: ComparisonOp,
        value: Value,
    },
}

impl FilterNode {
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Combinator {
            op: LogicalOp::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Combinator {
            op: LogicalOp::Or,
            children,
        }
    }

    pub fn condition(field: &str, op: ComparisonOp, value: Value) -> Self {
        FilterNode::Condition {
            field: field.to_string(),
            op,
            value,
        }
    }

    pub fn eq(field: &str, value: Value) -> Self {
        Self::condition(field, ComparisonOp::Eq, value)
    }

    /// Parse the wire form of a filter.
    ///
    /// An empty or null filter parses to `None` (match everything). When a
    /// node carries several entries (`_and` and `_or` siblings, or several
    /// condition fields), the entries are visited in the map's sorted key
    /// order and combined under an implicit AND; this is the documented
    /// deterministic tie-break for the legacy iteration-order ambiguity.
    pub fn from_wire(value: &Value) -> Result<Option<FilterNode>, TranslationError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Object(map) => {
                let mut nodes = Vec::new();
                for (key, entry) in map {
                    match key.as_str() {
                        "_and" => nodes.extend(Self::parse_combinator(LogicalOp::And, entry)?),
                        "_or" => nodes.extend(Self::parse_combinator(LogicalOp::Or, entry)?),
                        k if k.starts_with('_') => {
                            return Err(TranslationError::UnknownOperator(k.to_string()));
                        }
                        field => nodes.extend(Self::parse_field(field, entry)?),
                    }
                }
                Ok(Self::collapse(nodes))
            }
            other => Err(TranslationError::InvalidFilter(format!(
                "expected a filter object, got {other}"
            ))),
        }
    }

    /// A combinator whose children all resolve empty collapses away entirely
    /// (recursively, so `{_and: [{}]}` and `{_and: [{_or: []}]}` both vanish).
    /// An empty combinator must never reach a translator: it would render as
    /// a vacuous match-everything query, which the destructive-operation
    /// guard could not tell apart from a real filter.
    fn parse_combinator(
        op: LogicalOp,
        entry: &Value,
    ) -> Result<Option<FilterNode>, TranslationError> {
        let Value::Array(items) = entry else {
            return Err(TranslationError::InvalidFilter(
                "combinator value must be an array".to_string(),
            ));
        };

        let mut children = Vec::with_capacity(items.len());
        for item in items {
            if let Some(child) = Self::from_wire(item)? {
                children.push(child);
            }
        }
        if children.is_empty() {
            return Ok(None);
        }
        Ok(Some(FilterNode::Combinator { op, children }))
    }

    fn parse_field(field: &str, entry: &Value) -> Result<Vec<FilterNode>, TranslationError> {
        match entry {
            // {field: {_gt: 10, _lte: 50}} - one condition per operator key
            Value::Object(ops) => {
                let mut conditions = Vec::with_capacity(ops.len());
                for (op_key, op_value) in ops {
                    conditions.push(FilterNode::Condition {
                        field: field.to_string(),
                        op: ComparisonOp::parse(op_key)?,
                        value: op_value.clone(),
                    });
                }
                Ok(conditions)
            }
            // {field: value} is shorthand for {field: {_eq: value}}
            scalar => Ok(vec![FilterNode::eq(field, scalar.clone())]),
        }
    }

    fn collapse(mut nodes: Vec<FilterNode>) -> Option<FilterNode> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(FilterNode::and(nodes)),
        }
    }
}

/// Sort direction for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Result<Self, TranslationError> {
        match s {
            "ASC" | "asc" => Ok(SortOrder::Asc),
            "DESC" | "desc" => Ok(SortOrder::Desc),
            other => Err(TranslationError::InvalidFilter(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_combinator_with_condition() {
        let node = FilterNode::from_wire(&json!({"_and": [{"status": {"_eq": "SHIPPED"}}]}))
            .unwrap()
            .unwrap();

        assert_eq!(
            node,
            FilterNode::and(vec![FilterNode::eq("status", json!("SHIPPED"))])
        );
    }

    #[test]
    fn bare_value_is_shorthand_for_eq() {
        let node = FilterNode::from_wire(&json!({"status": "OPEN"})).unwrap().unwrap();
        assert_eq!(node, FilterNode::eq("status", json!("OPEN")));
    }

    #[test]
    fn multiple_operators_on_one_field_become_conditions() {
        let node = FilterNode::from_wire(&json!({"price": {"_gt": 10, "_lte": 50}}))
            .unwrap()
            .unwrap();

        assert_eq!(
            node,
            FilterNode::and(vec![
                FilterNode::condition("price", ComparisonOp::Gt, json!(10)),
                FilterNode::condition("price", ComparisonOp::Lte, json!(50)),
            ])
        );
    }

    #[test]
    fn sibling_combinators_collapse_under_implicit_and() {
        // serde_json objects iterate in sorted key order, so the tie-break
        // is deterministic: _and before _or, both under one AND.
        let node = FilterNode::from_wire(&json!({
            "_or": [{"b": 2}],
            "_and": [{"a": 1}],
        }))
        .unwrap()
        .unwrap();

        assert_eq!(
            node,
            FilterNode::and(vec![
                FilterNode::and(vec![FilterNode::eq("a", json!(1))]),
                FilterNode::or(vec![FilterNode::eq("b", json!(2))]),
            ])
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(FilterNode::from_wire(&json!({})).unwrap(), None);
        assert_eq!(FilterNode::from_wire(&Value::Null).unwrap(), None);
    }

    #[test]
    fn empty_combinators_resolve_to_no_filter() {
        assert_eq!(FilterNode::from_wire(&json!({"_and": []})).unwrap(), None);
        assert_eq!(FilterNode::from_wire(&json!({"_and": [{}]})).unwrap(), None);
        assert_eq!(
            FilterNode::from_wire(&json!({"_or": [{"_and": []}]})).unwrap(),
            None
        );

        // A combinator with one real child survives alongside an empty one
        let node = FilterNode::from_wire(&json!({
            "_and": [{"a": 1}],
            "_or": [],
        }))
        .unwrap()
        .unwrap();
        assert_eq!(node, FilterNode::and(vec![FilterNode::eq("a", json!(1))]));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = FilterNode::from_wire(&json!({"status": {"_regexp": "x"}})).unwrap_err();
        assert!(matches!(err, TranslationError::UnknownOperator(op) if op == "_regexp"));

        let err = FilterNode::from_wire(&json!({"_not": [{"a": 1}]})).unwrap_err();
        assert!(matches!(err, TranslationError::UnknownOperator(_)));
    }
}
