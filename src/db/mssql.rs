//! SQL Server database client.
//!
//! Uses tiberius over a plain TCP stream. The server certificate is
//! trusted, matching the product's bundled JDBC configuration.

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// SQL Server client over a single tiberius connection.
pub struct MssqlClient {
    client: Mutex<Client<Compat<TcpStream>>>,
}

impl MssqlClient {
    /// Connects to the server named by the descriptor. A failed attempt is
    /// terminal; nothing is retried.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let host = descriptor.host.as_deref().unwrap_or("localhost");
        let port = descriptor.port_or_default().unwrap_or(1433);

        let mut config = Config::new();
        config.host(host);
        config.port(port);
        if let Some(database) = descriptor.database.as_deref() {
            config.database(database);
        }
        config.authentication(AuthMethod::sql_server(
            descriptor.userid.as_deref().unwrap_or_default(),
            descriptor.password.as_deref().unwrap_or_default(),
        ));
        config.trust_cert();
        if descriptor.use_ssl {
            config.encryption(EncryptionLevel::Required);
        }

        debug!(code = %descriptor.code, host, port, "connecting to sql server");
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| DbQueryError::query(e.to_string()))?;
        tcp.set_nodelay(true)
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        Ok(Self {
            client: Mutex::new(client),
        })
    }
}

#[async_trait]
impl DatabaseClient for MssqlClient {
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let mut client = self.client.lock().await;
        let stream = client
            .simple_query(sql)
            .await
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        let result_sets = stream
            .into_results()
            .await
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        // Only the first result set is materialized; one statement per call.
        let Some(first) = result_sets.into_iter().next() else {
            return Ok(QueryResult::default());
        };

        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        for tds_row in first {
            if columns.is_empty() {
                columns = tds_row
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), format!("{:?}", col.column_type())))
                    .collect();
            }
            rows.push(tds_row.into_iter().map(convert_value).collect());
        }

        Ok(QueryResult::with_data(columns, rows).truncate_to(max_rows))
    }

    async fn close(&self) -> Result<()> {
        // The TDS session ends when the client drops with this struct.
        Ok(())
    }
}

fn convert_value(data: ColumnData<'_>) -> Value {
    match data {
        ColumnData::U8(v) => v.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(Value::Int).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(|v| Value::Float(v as f64)).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(Value::Float).unwrap_or(Value::Null),
        ColumnData::Bit(v) => v.map(Value::Bool).unwrap_or(Value::Null),
        ColumnData::String(v) => v
            .map(|s| Value::String(s.into_owned()))
            .unwrap_or(Value::Null),
        ColumnData::Binary(v) => v
            .map(|b| Value::Bytes(b.into_owned()))
            .unwrap_or(Value::Null),
        // GUIDs, numerics, and temporal types keep their text rendering.
        other => Value::String(format!("{other:?}")),
    }
}
