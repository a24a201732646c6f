//! SQLite database client.
//!
//! File-based dialect: the descriptor's `database` field is a path, which
//! must exist before a connection is attempted.

use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use tracing::debug;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// SQLite client over a single pooled connection.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the database file named by the descriptor.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let path = descriptor.database.as_deref().unwrap_or_default();
        if path.is_empty() || !Path::new(path).exists() {
            return Err(DbQueryError::FileNotFound(path.to_string()));
        }

        debug!(path, "opening sqlite database");
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DbQueryError::query(driver_message(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let mut stream = sqlx::query(sql).fetch(&self.pool);

        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        let mut truncated = false;

        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| DbQueryError::query(driver_message(e)))?
        {
            if columns.is_empty() {
                columns = row
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect();
            }
            if rows.len() == max_rows {
                truncated = true;
                break;
            }
            rows.push(convert_row(&row));
        }

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            row_count,
            total_rows: if truncated { None } else { Some(row_count) },
            was_truncated: truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Prefers the database's own message over sqlx's wrapper text.
fn driver_message(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" | "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "DATETIME" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .or_else(|| {
                row.try_get::<Option<String>, _>(index)
                    .ok()
                    .flatten()
                    .map(Value::String)
            })
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .or_else(|| {
                row.try_get::<Option<String>, _>(index)
                    .ok()
                    .flatten()
                    .map(Value::String)
            })
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
