//! Oracle database client.
//!
//! Uses the `oracle` crate (ODPI-C). The Oracle client library is loaded at
//! runtime; a missing library surfaces as a driver-unavailable error rather
//! than a crash.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, Dialect, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// Oracle client over a single synchronous connection.
pub struct OracleClient {
    conn: Arc<Mutex<oracle::Connection>>,
}

impl OracleClient {
    /// Connects to the service named by the descriptor. A failed attempt is
    /// terminal; nothing is retried.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let host = descriptor.host.clone().unwrap_or_else(|| "localhost".to_string());
        let port = descriptor.port_or_default().unwrap_or(1521);
        let service = descriptor.database.clone().unwrap_or_default();
        let user = descriptor.userid.clone().unwrap_or_default();
        let password = descriptor.password.clone().unwrap_or_default();
        let connect_string = format!("//{host}:{port}/{service}");

        debug!(code = %descriptor.code, %connect_string, "connecting to oracle");
        let conn = tokio::task::spawn_blocking(move || {
            oracle::Connection::connect(&user, &password, &connect_string)
                .map_err(map_connect_error)
        })
        .await
        .map_err(|e| DbQueryError::query(e.to_string()))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl DatabaseClient for OracleClient {
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || -> Result<QueryResult> {
            let conn = conn
                .lock()
                .map_err(|_| DbQueryError::query("oracle connection poisoned".to_string()))?;
            let result_set = conn
                .query(&sql, &[])
                .map_err(|e| DbQueryError::query(e.to_string()))?;

            let columns: Vec<ColumnInfo> = result_set
                .column_info()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.oracle_type().to_string()))
                .collect();

            let mut rows: Vec<Row> = Vec::new();
            let mut truncated = false;
            for raw in result_set {
                let raw = raw.map_err(|e| DbQueryError::query(e.to_string()))?;
                if rows.len() == max_rows {
                    truncated = true;
                    break;
                }
                let mut row: Row = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    row.push(convert_value(&raw, i));
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
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            if let Ok(conn) = conn.lock() {
                let _ = conn.close();
            }
        })
        .await
        .map_err(|e| DbQueryError::query(e.to_string()))?;
        Ok(())
    }
}

/// DPI-1047 means the Oracle client library itself is missing, which is a
/// capability problem rather than a query problem.
fn map_connect_error(error: oracle::Error) -> DbQueryError {
    let text = error.to_string();
    if text.contains("DPI-1047") {
        DbQueryError::driver_unavailable(
            Dialect::Oracle.as_str(),
            "Oracle client library (libclntsh) not found. Install the Oracle Instant Client.",
        )
    } else {
        DbQueryError::query(text)
    }
}

fn convert_value(row: &oracle::Row, index: usize) -> Value {
    if let Ok(v) = row.get::<usize, Option<i64>>(index) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.get::<usize, Option<f64>>(index) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.get::<usize, Option<Vec<u8>>>(index) {
        return v.map(Value::Bytes).unwrap_or(Value::Null);
    }
    match row.get::<usize, Option<String>>(index) {
        Ok(v) => v.map(Value::String).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    }
}
