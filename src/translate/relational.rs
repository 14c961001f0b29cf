//! Relational-dialect translator
//!
//! Renders the filter tree as one `WHERE (...)` fragment with `?`
//! placeholders and a positional parameter list in traversal order. Nested
//! combinators are flattened: children are joined with the combinator's
//! keyword and no inner parentheses are added beyond the outer wrap. The
//! `in`/`nin` operators are not part of this dialect's operator table.

use crate::errors::TranslationError;
use crate::filter::{ComparisonOp, FilterNode, LogicalOp, SortOrder};
use serde_json::Value;

const DIALECT: &str = "relational";

/// Sentinel limit emitted when a skip is supplied without a take. Legacy
/// behavior: the limit clause is always present once an offset is.
pub const LIMIT_SENTINEL: i64 = i64::MAX;

/// A rendered WHERE fragment plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    /// `"WHERE (...)"`, or empty when the filter matches everything.
    pub fragment: String,
    pub params: Vec<Value>,
}

impl SqlFilter {
    pub fn empty() -> Self {
        Self {
            fragment: String::new(),
            params: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }
}

/// Translate a filter tree into a WHERE fragment. `None` translates to the
/// empty fragment.
pub fn translate(filter: Option<&FilterNode>) -> Result<SqlFilter, TranslationError> {
    let Some(node) = filter else {
        return Ok(SqlFilter::empty());
    };

    let mut params = Vec::new();
    let inner = render_node(node, &mut params)?;
    if inner.is_empty() {
        return Ok(SqlFilter::empty());
    }

    Ok(SqlFilter {
        fragment: format!("WHERE ({inner})"),
        params,
    })
}

fn render_node(node: &FilterNode, params: &mut Vec<Value>) -> Result<String, TranslationError> {
    match node {
        FilterNode::Combinator { op, children } => {
            let keyword = match op {
                LogicalOp::And => " AND ",
                LogicalOp::Or => " OR ",
            };
            let rendered = children
                .iter()
                .map(|child| render_node(child, params))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rendered.join(keyword))
        }
        FilterNode::Condition { field, op, value } => {
            let sql_op = sql_operator(*op)?;
            params.push(value.clone());
            Ok(format!("{field} {sql_op} ?"))
        }
    }
}

fn sql_operator(op: ComparisonOp) -> Result<&'static str, TranslationError> {
    match op {
        ComparisonOp::Eq => Ok("="),
        ComparisonOp::Neq => Ok("<>"),
        ComparisonOp::Lt => Ok("<"),
        ComparisonOp::Lte => Ok("<="),
        ComparisonOp::Gt => Ok(">"),
        ComparisonOp::Gte => Ok(">="),
        ComparisonOp::Like => Ok("LIKE"),
        // Absent from this dialect's operator table
        ComparisonOp::In | ComparisonOp::Nin => Err(TranslationError::UnsupportedOperator {
            operator: op.as_str(),
            dialect: DIALECT,
        }),
    }
}

/// Render the LIMIT/OFFSET clause. A `skip` without a `take` emits
/// `LIMIT <sentinel> OFFSET <skip>` rather than omitting the limit.
pub fn render_limit(skip: Option<u64>, take: Option<u64>) -> String {
    match (skip, take) {
        (None, None) => String::new(),
        (None, Some(take)) => format!("LIMIT {take}"),
        (Some(skip), Some(take)) => format!("LIMIT {take} OFFSET {skip}"),
        (Some(skip), None) => format!("LIMIT {LIMIT_SENTINEL} OFFSET {skip}"),
    }
}

/// Render the ORDER BY clause. No sort means store-defined row order.
pub fn render_order_by(sort: &[(String, SortOrder)]) -> String {
    if sort.is_empty() {
        return String::new();
    }

    let items: Vec<String> = sort
        .iter()
        .map(|(field, order)| format!("{field} {}", order.to_sql()))
        .collect();
    format!("ORDER BY {}", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(wire: Value) -> FilterNode {
        FilterNode::from_wire(&wire).unwrap().unwrap()
    }

    #[test]
    fn and_renders_one_placeholder_per_condition_in_order() {
        let node = FilterNode::and(vec![
            FilterNode::eq("a", json!(1)),
            FilterNode::eq("b", json!("x")),
            FilterNode::eq("c", json!(true)),
        ]);
        let sql = translate(Some(&node)).unwrap();

        assert_eq!(sql.fragment.matches('?').count(), 3);
        assert_eq!(sql.fragment, "WHERE (a = ? AND b = ? AND c = ?)");
        assert_eq!(sql.params, vec![json!(1), json!("x"), json!(true)]);
    }

    #[test]
    fn price_range_renders_expected_fragment() {
        let node = parse(json!({"_and": [{"price": {"_gt": 10}}, {"price": {"_lte": 50}}]}));
        let sql = translate(Some(&node)).unwrap();

        assert_eq!(sql.fragment, "WHERE (price > ? AND price <= ?)");
        assert_eq!(sql.params, vec![json!(10), json!(50)]);
    }

    #[test]
    fn nested_combinators_are_flattened() {
        let node = FilterNode::and(vec![
            FilterNode::or(vec![
                FilterNode::eq("a", json!(1)),
                FilterNode::eq("b", json!(2)),
            ]),
            FilterNode::eq("c", json!(3)),
        ]);
        let sql = translate(Some(&node)).unwrap();

        // No inner parentheses: flattening is the documented behavior.
        assert_eq!(sql.fragment, "WHERE (a = ? OR b = ? AND c = ?)");
        assert_eq!(sql.params, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn single_condition_still_gets_the_outer_wrap() {
        let node = FilterNode::eq("order_id", json!(42));
        let sql = translate(Some(&node)).unwrap();
        assert_eq!(sql.fragment, "WHERE (order_id = ?)");
    }

    #[test]
    fn in_operator_is_unsupported() {
        let node = parse(json!({"status": {"_in": "A,B"}}));
        let err = translate(Some(&node)).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::UnsupportedOperator { operator: "_in", dialect: "relational" }
        ));
    }

    #[test]
    fn like_and_neq_use_the_operator_table() {
        let node = FilterNode::and(vec![
            FilterNode::condition("name", ComparisonOp::Like, json!("%smith%")),
            FilterNode::condition("status", ComparisonOp::Neq, json!("VOID")),
        ]);
        let sql = translate(Some(&node)).unwrap();
        assert_eq!(sql.fragment, "WHERE (name LIKE ? AND status <> ?)");
    }

    #[test]
    fn skip_without_take_emits_the_sentinel_limit() {
        assert_eq!(
            render_limit(Some(20), None),
            format!("LIMIT {LIMIT_SENTINEL} OFFSET 20")
        );
        assert_eq!(render_limit(Some(5), Some(10)), "LIMIT 10 OFFSET 5");
        assert_eq!(render_limit(None, Some(10)), "LIMIT 10");
        assert_eq!(render_limit(None, None), "");
    }

    #[test]
    fn order_by_renders_in_declaration_order() {
        let sort = vec![
            ("created_at".to_string(), SortOrder::Desc),
            ("id".to_string(), SortOrder::Asc),
        ];
        assert_eq!(render_order_by(&sort), "ORDER BY created_at DESC, id ASC");
        assert_eq!(render_order_by(&[]), "");
    }

    #[test]
    fn empty_filter_translates_to_empty_fragment() {
        let sql = translate(None).unwrap();
        assert!(sql.is_empty());
        assert!(sql.params.is_empty());
    }
}
