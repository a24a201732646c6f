//! Database abstraction layer.
//!
//! Provides a trait-based interface for database clients plus the
//! dialect-keyed factory that selects one of the nine supported backends.
//! Dialects whose driver is not compiled in fail with a driver-unavailable
//! error naming the cargo feature to enable.

#[cfg(feature = "clickhouse")]
mod clickhouse;
#[cfg(feature = "db2")]
mod db2;
#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "mssql")]
mod mssql;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;
mod types;

pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::connections::ConnectionDescriptor;
use crate::error::{DbQueryError, Result};
use async_trait::async_trait;

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    DuckDb,
    Postgres,
    MySql,
    MariaDb,
    SqlServer,
    Oracle,
    Db2,
    ClickHouse,
}

impl Dialect {
    /// All supported dialects, in registry display order.
    pub const ALL: [Dialect; 9] = [
        Dialect::Sqlite,
        Dialect::DuckDb,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::MariaDb,
        Dialect::SqlServer,
        Dialect::Oracle,
        Dialect::Db2,
        Dialect::ClickHouse,
    ];

    /// Returns the canonical dialect name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::DuckDb => "duckdb",
            Self::Postgres => "postgresql",
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
            Self::Db2 => "db2",
            Self::ClickHouse => "clickhouse",
        }
    }

    /// Parses a dialect from a descriptor string, accepting the spellings
    /// ReportBurster descriptors use.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "duckdb" => Some(Self::DuckDb),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            "mariadb" => Some(Self::MariaDb),
            "sqlserver" => Some(Self::SqlServer),
            "oracle" => Some(Self::Oracle),
            "db2" | "ibmdb2" => Some(Self::Db2),
            "clickhouse" => Some(Self::ClickHouse),
            _ => None,
        }
    }

    /// Returns the default port for this dialect, or `None` for file-based
    /// dialects that have no server endpoint.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Sqlite | Self::DuckDb => None,
            Self::Postgres => Some(5432),
            Self::MySql | Self::MariaDb => Some(3306),
            Self::SqlServer => Some(1433),
            Self::Oracle => Some(1521),
            Self::Db2 => Some(50000),
            Self::ClickHouse => Some(8123),
        }
    }

    /// Returns true for dialects whose `database` field is a file path
    /// rather than a server-side database name.
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::Sqlite | Self::DuckDb)
    }

    /// Returns the canonical table-enumeration statement for this dialect,
    /// used to service `SHOW TABLES` / `LIST TABLES` requests.
    pub fn table_listing_sql(&self) -> &'static str {
        match self {
            Self::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
            Self::DuckDb => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema='main' ORDER BY table_name"
            }
            Self::Postgres => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema='public' AND table_type='BASE TABLE' ORDER BY table_name"
            }
            Self::MySql | Self::MariaDb => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema=DATABASE() AND table_type='BASE TABLE' ORDER BY table_name"
            }
            Self::SqlServer => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema='dbo' AND table_type='BASE TABLE' ORDER BY table_name"
            }
            Self::Oracle => "SELECT table_name FROM user_tables ORDER BY table_name",
            Self::Db2 => {
                "SELECT tabname AS table_name FROM syscat.tables WHERE tabschema=CURRENT SCHEMA AND type='T' ORDER BY tabname"
            }
            Self::ClickHouse => {
                "SELECT name AS table_name FROM system.tables WHERE database=currentDatabase() ORDER BY name"
            }
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait defining the interface for database clients.
///
/// One client is opened per invocation and closed on every exit path.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a SQL statement, fetching at most `max_rows` rows.
    ///
    /// Implementations probe for one extra row only to decide whether the
    /// result was cut off; `was_truncated` is set accordingly. A statement
    /// with no column metadata yields an empty `columns` vector.
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult>;

    /// Closes the underlying connection.
    async fn close(&self) -> Result<()>;
}

/// Creates a database client for the descriptor's dialect.
///
/// This is the central factory for the nine-way dialect dispatch.
pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    match descriptor.dialect {
        Dialect::Sqlite => sqlite_client(descriptor).await,
        Dialect::DuckDb => duckdb_client(descriptor).await,
        Dialect::Postgres => postgres_client(descriptor).await,
        Dialect::MySql | Dialect::MariaDb => mysql_client(descriptor).await,
        Dialect::SqlServer => mssql_client(descriptor).await,
        Dialect::Oracle => oracle_client(descriptor).await,
        Dialect::Db2 => db2_client(descriptor).await,
        Dialect::ClickHouse => clickhouse_client(descriptor).await,
    }
}

fn missing_driver(dialect: Dialect, feature: &str) -> DbQueryError {
    DbQueryError::driver_unavailable(
        dialect.as_str(),
        format!("not compiled in. Rebuild with `--features {feature}` to enable it."),
    )
}

#[cfg(feature = "sqlite")]
async fn sqlite_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(sqlite::SqliteClient::connect(descriptor).await?))
}

#[cfg(not(feature = "sqlite"))]
async fn sqlite_client(_descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(Dialect::Sqlite, "sqlite"))
}

#[cfg(feature = "duckdb")]
async fn duckdb_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(duckdb::DuckDbClient::connect(descriptor).await?))
}

#[cfg(not(feature = "duckdb"))]
async fn duckdb_client(_descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(Dialect::DuckDb, "duckdb"))
}

#[cfg(feature = "postgres")]
async fn postgres_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(postgres::PostgresClient::connect(descriptor).await?))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_client(_descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(Dialect::Postgres, "postgres"))
}

#[cfg(feature = "mysql")]
async fn mysql_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(mysql::MySqlClient::connect(descriptor).await?))
}

#[cfg(not(feature = "mysql"))]
async fn mysql_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(descriptor.dialect, "mysql"))
}

#[cfg(feature = "mssql")]
async fn mssql_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(mssql::MssqlClient::connect(descriptor).await?))
}

#[cfg(not(feature = "mssql"))]
async fn mssql_client(_descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(Dialect::SqlServer, "mssql"))
}

#[cfg(feature = "oracle")]
async fn oracle_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(oracle::OracleClient::connect(descriptor).await?))
}

#[cfg(not(feature = "oracle"))]
async fn oracle_client(_descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(Dialect::Oracle, "oracle"))
}

#[cfg(feature = "db2")]
async fn db2_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(db2::Db2Client::connect(descriptor).await?))
}

#[cfg(not(feature = "db2"))]
async fn db2_client(_descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(Dialect::Db2, "db2"))
}

#[cfg(feature = "clickhouse")]
async fn clickhouse_client(descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Ok(Box::new(clickhouse::ClickHouseClient::connect(descriptor)?))
}

#[cfg(not(feature = "clickhouse"))]
async fn clickhouse_client(_descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseClient>> {
    Err(missing_driver(Dialect::ClickHouse, "clickhouse"))
}
