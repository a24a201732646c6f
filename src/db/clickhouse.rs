//! ClickHouse database client.
//!
//! ClickHouse is queried over its HTTP interface rather than a linked
//! driver: statements are POSTed with `default_format=JSONCompact` and the
//! response's `meta`/`data` arrays are mapped onto the common result types.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::connections::ConnectionDescriptor;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{DbQueryError, Result};

/// ClickHouse client over the HTTP interface.
#[derive(Debug)]
pub struct ClickHouseClient {
    http: reqwest::Client,
    endpoint: Url,
    user: String,
    password: String,
}

impl ClickHouseClient {
    /// Builds a client for the server named by the descriptor. The HTTP
    /// connection itself is established on the first request.
    pub fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let endpoint = build_endpoint(descriptor)?;
        debug!(code = %descriptor.code, "preparing clickhouse http client");

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            user: descriptor
                .userid
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "default".to_string()),
            password: descriptor.password.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl DatabaseClient for ClickHouseClient {
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header("X-ClickHouse-User", &self.user)
            .header("X-ClickHouse-Key", &self.password)
            .body(sql.to_string())
            .send()
            .await
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DbQueryError::query(e.to_string()))?;

        if !status.is_success() {
            // ClickHouse returns its error text as the body.
            return Err(DbQueryError::query(body.trim().to_string()));
        }

        if body.trim().is_empty() {
            return Ok(QueryResult::default());
        }

        let parsed: CompactResponse = serde_json::from_str(&body).map_err(|e| {
            DbQueryError::query(format!("unexpected clickhouse response: {e}"))
        })?;

        let columns: Vec<ColumnInfo> = parsed
            .meta
            .into_iter()
            .map(|m| ColumnInfo::new(m.name, m.column_type))
            .collect();
        let rows: Vec<Row> = parsed
            .data
            .into_iter()
            .map(|row| row.into_iter().map(convert_value).collect())
            .collect();

        Ok(QueryResult::with_data(columns, rows).truncate_to(max_rows))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds the HTTP endpoint carrying database and format parameters.
fn build_endpoint(descriptor: &ConnectionDescriptor) -> Result<Url> {
    let host = descriptor
        .host
        .as_deref()
        .ok_or_else(|| DbQueryError::malformed("clickhouse connection has no host".to_string()))?;
    let scheme = if descriptor.use_ssl { "https" } else { "http" };
    let port = descriptor.port_or_default().unwrap_or(8123);

    let mut url = Url::parse(&format!("{scheme}://{host}:{port}/"))
        .map_err(|e| DbQueryError::malformed(format!("invalid host '{host}': {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("default_format", "JSONCompact");
        if let Some(database) = descriptor.database.as_deref() {
            pairs.append_pair("database", database);
        }
    }
    Ok(url)
}

/// The subset of ClickHouse's JSONCompact envelope we consume.
#[derive(Debug, Deserialize)]
struct CompactResponse {
    #[serde(default)]
    meta: Vec<CompactColumn>,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CompactColumn {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
}

fn convert_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        // Nested arrays/maps keep their JSON text form.
        other => Value::String(other.to_string()),
    }
}
