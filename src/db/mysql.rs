//! MySQL / MariaDB database client.
//!
//! Both dialects share the MySQL wire protocol and driver; only their
//! registry dialect names differ.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use tracing::debug;
use url::Url;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// MySQL/MariaDB client over a single pooled connection.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Connects to the server named by the descriptor. A failed attempt is
    /// terminal; nothing is retried.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let dsn = build_dsn(descriptor)?;
        debug!(code = %descriptor.code, dialect = %descriptor.dialect, "connecting to mysql server");

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&dsn)
            .await
            .map_err(|e| DbQueryError::query(driver_message(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
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

/// Builds a `mysql://` DSN from the descriptor, percent-encoding credentials.
fn build_dsn(descriptor: &ConnectionDescriptor) -> Result<String> {
    let mut url =
        Url::parse("mysql://localhost").map_err(|e| DbQueryError::malformed(e.to_string()))?;

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
    url.query_pairs_mut().append_pair(
        "ssl-mode",
        if descriptor.use_ssl { "REQUIRED" } else { "DISABLED" },
    );

    Ok(url.to_string())
}

/// Prefers the server's own message over sqlx's wrapper text.
fn driver_message(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" | "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => row
            .try_get::<Option<u32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "VARBINARY" | "BINARY" => row
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

        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
