//! rb-dbquery — read-only multi-database query routing for ReportBurster
//! connections.
//!
//! Resolves a connection code against the product's connection registry,
//! opens the dialect-appropriate client (sqlite, duckdb, postgresql, mysql,
//! mariadb, sqlserver, oracle, db2, clickhouse), runs a single read-only
//! statement, and renders the result as a table, JSON, or CSV. Destructive
//! SQL is blocked before any driver contact.
//!
//! This crate is a library invoked by an external caller (an AI-agent tool
//! runner or an HTTP handler); it has no listener or CLI of its own.
//!
//! ```no_run
//! use rb_dbquery::{OutputFormat, QueryRequest, QueryRouter};
//!
//! # async fn example() -> rb_dbquery::Result<()> {
//! let router = QueryRouter::from_env();
//! let listing = router
//!     .run(&QueryRequest::new("", "LIST CONNECTIONS"))
//!     .await?;
//! let rows = router
//!     .run(
//!         &QueryRequest::new("sample-northwind-sqlite", "SELECT * FROM Customers")
//!             .with_format(OutputFormat::Json)
//!             .with_max_rows(10),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connections;
pub mod db;
pub mod error;
pub mod query;
pub mod safety;

pub use config::RegistrySettings;
pub use connections::{
    ConnectionDescriptor, ConnectionRegistry, ListedConnection, ListedDetail,
    SAMPLE_CONNECTION_CODE,
};
pub use db::{ColumnInfo, Dialect, QueryResult, Row, Value};
pub use error::{DbQueryError, Result};
pub use query::{OutputFormat, QueryOutcome, QueryRequest, QueryRouter, DEFAULT_MAX_ROWS};

/// Runs one query against a registry configured from the environment.
///
/// This is the library's tool-call surface: connection code, SQL text,
/// output format, and row cutoff in, a rendered string out.
pub async fn db_query(
    connection_code: &str,
    sql: &str,
    format: OutputFormat,
    max_rows: usize,
) -> Result<String> {
    QueryRouter::from_env()
        .run(
            &QueryRequest::new(connection_code, sql)
                .with_format(format)
                .with_max_rows(max_rows),
        )
        .await
}
