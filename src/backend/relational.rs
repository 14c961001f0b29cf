//! Relational backend
//!
//! PostgreSQL client bound to one table. The translator renders `?`
//! placeholders; this backend numbers them (`$1`, `$2`, ...) and binds the
//! positional parameters in order. Rows cross the seam as JSON objects via
//! `row_to_json`.

use super::{BackendConnection, BackendError, NativeQuery, SqlQuery};
use crate::entity::Dialect;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use std::sync::Arc;

/// Relational backend client bound to one table
pub struct RelationalConnection {
    pool: PgPool,
    table: String,
    storage: Option<Arc<dyn super::ObjectStorage>>,
}

impl RelationalConnection {
    pub fn new(
        pool: PgPool,
        table: &str,
        storage: Option<Arc<dyn super::ObjectStorage>>,
    ) -> Self {
        Self {
            pool,
            table: table.to_string(),
            storage,
        }
    }

    fn query<'q>(&self, query: &'q NativeQuery) -> Result<&'q SqlQuery, BackendError> {
        match query {
            NativeQuery::Sql(q) => Ok(q),
            NativeQuery::Document(_) => Err(BackendError::DialectMismatch {
                expected: "relational",
            }),
        }
    }

    fn json_row(row: &PgRow) -> Result<Value, BackendError> {
        row.try_get::<Value, _>("row")
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BackendConnection for RelationalConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Relational
    }

    async fn find(&self, query: &NativeQuery) -> Result<Vec<Value>, BackendError> {
        let query = self.query(query)?;
        let sql = compose(&[
            &format!("SELECT row_to_json(t.*) AS row FROM {} t", self.table),
            &number_placeholders(&query.filter.fragment, 1),
            &query.order_by,
            &query.limit,
        ]);

        let mut stmt = sqlx::query(&sql);
        for param in &query.filter.params {
            stmt = bind_value(stmt, param);
        }

        let rows = stmt.fetch_all(&self.pool).await?;
        rows.iter().map(Self::json_row).collect()
    }

    async fn count(&self, query: &NativeQuery) -> Result<i64, BackendError> {
        let query = self.query(query)?;
        let sql = compose(&[
            &format!("SELECT COUNT(*) AS count FROM {}", self.table),
            &number_placeholders(&query.filter.fragment, 1),
        ]);

        let mut stmt = sqlx::query(&sql);
        for param in &query.filter.params {
            stmt = bind_value(stmt, param);
        }

        let row = stmt.fetch_one(&self.pool).await?;
        row.try_get("count")
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn create(&self, row: Map<String, Value>) -> Result<Value, BackendError> {
        let columns: Vec<&String> = row.keys().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO {table} AS t ({columns}) VALUES ({placeholders}) RETURNING row_to_json(t.*) AS row",
            table = self.table,
            columns = columns
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            placeholders = placeholders.join(", "),
        );

        let mut stmt = sqlx::query(&sql);
        for value in row.values() {
            stmt = bind_value(stmt, value);
        }

        let inserted = stmt.fetch_one(&self.pool).await?;
        Self::json_row(&inserted)
    }

    async fn update(
        &self,
        query: &NativeQuery,
        fields: Map<String, Value>,
    ) -> Result<Vec<Value>, BackendError> {
        let query = self.query(query)?;

        let assignments: Vec<String> = fields
            .keys()
            .enumerate()
            .map(|(i, column)| format!("{column} = ${}", i + 1))
            .collect();
        let sql = compose(&[
            &format!(
                "UPDATE {} AS t SET {}",
                self.table,
                assignments.join(", ")
            ),
            // Filter placeholders continue after the SET parameters
            &number_placeholders(&query.filter.fragment, fields.len() + 1),
            "RETURNING row_to_json(t.*) AS row",
        ]);

        let mut stmt = sqlx::query(&sql);
        for value in fields.values() {
            stmt = bind_value(stmt, value);
        }
        for param in &query.filter.params {
            stmt = bind_value(stmt, param);
        }

        let rows = stmt.fetch_all(&self.pool).await?;
        rows.iter().map(Self::json_row).collect()
    }

    async fn delete(&self, query: &NativeQuery) -> Result<u64, BackendError> {
        let query = self.query(query)?;
        let sql = compose(&[
            &format!("DELETE FROM {}", self.table),
            &number_placeholders(&query.filter.fragment, 1),
        ]);

        let mut stmt = sqlx::query(&sql);
        for param in &query.filter.params {
            stmt = bind_value(stmt, param);
        }

        let result = stmt.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, BackendError> {
        match &self.storage {
            Some(storage) => storage.put(name, bytes).await,
            None => Err(BackendError::Unsupported {
                operation: "upload",
                dialect: "relational",
            }),
        }
    }
}

/// Join non-empty SQL pieces with single spaces.
fn compose(pieces: &[&str]) -> String {
    pieces
        .iter()
        .filter(|piece| !piece.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace each `?` placeholder with `$n`, numbering from `start`.
fn number_placeholders(fragment: &str, start: usize) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut next = start;
    for ch in fragment.chars() {
        if ch == '?' {
            out.push('$');
            out.push_str(&next.to_string());
            next += 1;
        } else {
            out.push(ch);
        }
    }
    out
}

fn bind_value<'q>(
    stmt: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => stmt.bind(Option::<String>::None),
        Value::Bool(b) => stmt.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                stmt.bind(i)
            } else {
                stmt.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => stmt.bind(s.clone()),
        // Arrays and objects bind as jsonb
        other => stmt.bind(other.clone()),
    }
}
