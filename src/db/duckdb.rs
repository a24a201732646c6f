//! DuckDB database client.
//!
//! File-based dialect using the bundled `duckdb` crate. The driver API is
//! synchronous, so queries run on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use duckdb::types::Value as DuckValue;
use duckdb::Connection;
use tracing::debug;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// DuckDB client over a single synchronous connection.
pub struct DuckDbClient {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbClient {
    /// Opens the database file named by the descriptor, or an in-memory
    /// database when no path is configured.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let path = descriptor.database.clone().unwrap_or_default();

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            if path.is_empty() {
                debug!("opening in-memory duckdb database");
                Connection::open_in_memory().map_err(|e| DbQueryError::query(e.to_string()))
            } else {
                if !Path::new(&path).exists() {
                    return Err(DbQueryError::FileNotFound(path));
                }
                debug!(path, "opening duckdb database");
                Connection::open(&path).map_err(|e| DbQueryError::query(e.to_string()))
            }
        })
        .await
        .map_err(|e| DbQueryError::query(e.to_string()))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl DatabaseClient for DuckDbClient {
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || -> Result<QueryResult> {
            let conn = conn
                .lock()
                .map_err(|_| DbQueryError::query("duckdb connection poisoned".to_string()))?;
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| DbQueryError::query(e.to_string()))?;
            let mut raw_rows = stmt
                .query([])
                .map_err(|e| DbQueryError::query(e.to_string()))?;

            let mut columns: Vec<ColumnInfo> = Vec::new();
            let mut rows: Vec<Row> = Vec::new();
            let mut truncated = false;

            while let Some(raw) = raw_rows
                .next()
                .map_err(|e| DbQueryError::query(e.to_string()))?
            {
                if columns.is_empty() {
                    let stmt_ref = raw.as_ref();
                    columns = stmt_ref
                        .column_names()
                        .into_iter()
                        .map(|name| ColumnInfo::new(name, ""))
                        .collect();
                }
                if rows.len() == max_rows {
                    truncated = true;
                    break;
                }
                let mut row: Row = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    let value: DuckValue = raw
                        .get(i)
                        .map_err(|e| DbQueryError::query(e.to_string()))?;
                    row.push(convert_value(value));
                }
                rows.push(row);
            }

            let row_count = rows.len();
            Ok(QueryResult {
                columns,
                rows,
                row_count,
                total_rows: if truncated { None } else { Some(row_count) },
                was_truncated: truncated,
            })
        })
        .await
        .map_err(|e| DbQueryError::query(e.to_string()))?
    }

    async fn close(&self) -> Result<()> {
        // The connection closes when the last Arc clone drops.
        Ok(())
    }
}

fn convert_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(v) => Value::Int(v as i64),
        DuckValue::SmallInt(v) => Value::Int(v as i64),
        DuckValue::Int(v) => Value::Int(v as i64),
        DuckValue::BigInt(v) => Value::Int(v),
        DuckValue::UTinyInt(v) => Value::Int(v as i64),
        DuckValue::USmallInt(v) => Value::Int(v as i64),
        DuckValue::UInt(v) => Value::Int(v as i64),
        DuckValue::UBigInt(v) => i64::try_from(v)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(v.to_string())),
        DuckValue::Float(v) => Value::Float(v as f64),
        DuckValue::Double(v) => Value::Float(v),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(b) => Value::Bytes(b),
        // Temporal, decimal, and nested types keep their text rendering.
        other => Value::String(format!("{other:?}")),
    }
}
