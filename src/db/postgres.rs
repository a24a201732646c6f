//! PostgreSQL database client.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use tracing::debug;
use url::Url;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// PostgreSQL client over a single pooled connection.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connects to the server named by the descriptor. A failed attempt is
    /// terminal; nothing is retried.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let dsn = build_dsn(descriptor)?;
        debug!(code = %descriptor.code, "connecting to postgresql");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&dsn)
            .await
            .map_err(|e| map_connection_error(e, descriptor))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let mut stream = sqlx::query(sql).fetch(&self.pool);

        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        let mut truncated = false;

        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| DbQueryError::query(format_query_error(e)))?
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

/// Builds a `postgres://` DSN from the descriptor, percent-encoding
/// credentials.
fn build_dsn(descriptor: &ConnectionDescriptor) -> Result<String> {
    let mut url = Url::parse("postgres://localhost")
        .map_err(|e| DbQueryError::malformed(e.to_string()))?;

    let host = descriptor.host.as_deref().unwrap_or("localhost");
    url.set_host(Some(host))
        .map_err(|e| DbQueryError::malformed(format!("invalid host '{host}': {e}")))?;
    url.set_port(descriptor.port_or_default())
        .map_err(|_| DbQueryError::malformed("invalid port".to_string()))?;

    if let Some(user) = descriptor.userid.as_deref() {
        url.set_username(user)
            .map_err(|_| DbQueryError::malformed("invalid userid".to_string()))?;
        if let Some(password) = descriptor.password.as_deref() {
            url.set_password(Some(password))
                .map_err(|_| DbQueryError::malformed("invalid password".to_string()))?;
        }
    }
    if let Some(database) = descriptor.database.as_deref() {
        url.set_path(database);
    }
    url.query_pairs_mut()
        .append_pair("sslmode", if descriptor.use_ssl { "require" } else { "prefer" });

    Ok(url.to_string())
}

/// Maps connection errors to actionable messages.
fn map_connection_error(error: sqlx::Error, descriptor: &ConnectionDescriptor) -> DbQueryError {
    let host = descriptor.host.as_deref().unwrap_or("localhost");
    let port = descriptor.port_or_default().unwrap_or(5432);
    let user = descriptor.userid.as_deref().unwrap_or("unknown");
    let database = descriptor.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        DbQueryError::query(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("authentication failed") {
        DbQueryError::query(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        DbQueryError::query(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        DbQueryError::query(format!(
            "Connection to {host}:{port} timed out. The server may be unreachable."
        ))
    } else {
        DbQueryError::query(error.to_string())
    }
}

/// Formats a query error, keeping the server's DETAIL and HINT lines.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = db_error.message().to_string();
    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }
    result
}

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),

        // Everything else decodes through its text representation.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
