//! IBM Db2 database client.
//!
//! Db2 has no maintained native Rust driver, so the connection goes through
//! ODBC (`odbc-api`) and the platform's Db2 ODBC driver. Values are fetched
//! through their text representation.

use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use odbc_api::buffers::TextRowSet;
use odbc_api::{Connection, ConnectionOptions, Cursor, Environment, ResultSetMetadata};
use tracing::debug;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, Dialect, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// Rows fetched per ODBC round trip.
const BATCH_SIZE: usize = 256;

/// Upper bound on a single text cell, in bytes.
const MAX_CELL_BYTES: usize = 65536;

fn odbc_environment() -> Result<&'static Environment> {
    static ENV: OnceLock<Environment> = OnceLock::new();
    if let Some(env) = ENV.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| {
        DbQueryError::driver_unavailable(
            Dialect::Db2.as_str(),
            format!("ODBC environment unavailable: {e}. Install unixODBC and the Db2 ODBC driver."),
        )
    })?;
    Ok(ENV.get_or_init(|| env))
}

/// Db2 client over a single ODBC connection.
pub struct Db2Client {
    conn: Mutex<Connection<'static>>,
}

impl Db2Client {
    /// Connects through the Db2 ODBC driver. A failed attempt is terminal;
    /// nothing is retried.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let host = descriptor.host.as_deref().unwrap_or("localhost");
        let port = descriptor.port_or_default().unwrap_or(50000);
        let database = descriptor.database.as_deref().unwrap_or_default();
        let user = descriptor.userid.as_deref().unwrap_or_default();
        let password = descriptor.password.as_deref().unwrap_or_default();

        let connection_string = format!(
            "Driver={{IBM DB2 ODBC DRIVER}};Database={database};Hostname={host};Port={port};Protocol=TCPIP;Uid={user};Pwd={password};"
        );

        debug!(code = %descriptor.code, host, port, "connecting to db2 via odbc");
        let env = odbc_environment()?;
        let conn = env
            .connect_with_connection_string(&connection_string, ConnectionOptions::default())
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl DatabaseClient for Db2Client {
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DbQueryError::query("db2 connection poisoned".to_string()))?;

        let maybe_cursor = conn
            .execute(sql, (), None)
            .map_err(|e| DbQueryError::query(e.to_string()))?;
        let Some(mut cursor) = maybe_cursor else {
            return Ok(QueryResult::default());
        };

        let column_count = cursor
            .num_result_cols()
            .map_err(|e| DbQueryError::query(e.to_string()))? as u16;
        let mut columns: Vec<ColumnInfo> = Vec::with_capacity(column_count as usize);
        for i in 1..=column_count {
            let name = cursor
                .col_name(i)
                .map_err(|e| DbQueryError::query(e.to_string()))?;
            let data_type = cursor
                .col_data_type(i)
                .map(|t| format!("{t:?}"))
                .unwrap_or_default();
            columns.push(ColumnInfo::new(name, data_type));
        }

        let mut buffers = TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_CELL_BYTES))
            .map_err(|e| DbQueryError::query(e.to_string()))?;
        let mut row_set_cursor = cursor
            .bind_buffer(&mut buffers)
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        let mut rows: Vec<Row> = Vec::new();
        let mut truncated = false;
        'fetch: while let Some(batch) = row_set_cursor
            .fetch()
            .map_err(|e| DbQueryError::query(e.to_string()))?
        {
            for r in 0..batch.num_rows() {
                if rows.len() == max_rows {
                    truncated = true;
                    break 'fetch;
                }
                let row: Row = (0..batch.num_cols())
                    .map(|c| match batch.at(c, r) {
                        Some(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
                        None => Value::Null,
                    })
                    .collect();
                rows.push(row);
            }
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
        // The ODBC handle is released when this struct drops.
        Ok(())
    }
}
