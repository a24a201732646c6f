//! Registry configuration and connection descriptor parsing.
//!
//! The connection registry is a directory owned by the host product: one
//! subdirectory per connection code, each holding a single declarative
//! TOML descriptor (`<code>/<code>.toml`). This crate only reads it.
//!
//! Descriptor format:
//!
//! ```toml
//! [connection]
//! code = "db-sales-postgres"
//! name = "Sales warehouse"
//! default = false
//!
//! [connection.server]
//! dialect = "postgresql"
//! host = "db.local"
//! port = 5432
//! database = "sales"
//! userid = "rb_reader"
//! password = "secret"
//! use_ssl = false
//! ```

use crate::connections::ConnectionDescriptor;
use crate::db::Dialect;
use crate::error::{DbQueryError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the connection registry location.
pub const CONNECTIONS_PATH_ENV: &str = "REPORTBURSTER_CONNECTIONS_PATH";

/// Environment variable overriding the sample database location.
pub const DB_PATH_ENV: &str = "REPORTBURSTER_DB_PATH";

/// Where the registry and the bundled sample databases live.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Directory of connection records, one subdirectory per code.
    pub connections_dir: PathBuf,

    /// Directory holding sample database files.
    pub samples_dir: PathBuf,
}

impl RegistrySettings {
    /// Creates settings with explicit paths. Embedders and tests use this.
    pub fn new(connections_dir: impl Into<PathBuf>, samples_dir: impl Into<PathBuf>) -> Self {
        Self {
            connections_dir: connections_dir.into(),
            samples_dir: samples_dir.into(),
        }
    }

    /// Resolves settings from the environment, falling back to the
    /// platform config directory (`<config>/reportburster/{connections,db}`).
    pub fn from_env() -> Self {
        let base = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reportburster");

        let connections_dir = std::env::var_os(CONNECTIONS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join("connections"));
        let samples_dir = std::env::var_os(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join("db"));

        Self {
            connections_dir,
            samples_dir,
        }
    }

    /// Returns the descriptor file path for a connection code.
    pub fn descriptor_path(&self, code: &str) -> PathBuf {
        self.connections_dir.join(code).join(format!("{code}.toml"))
    }
}

/// Raw TOML shape of a descriptor file.
#[derive(Debug, Deserialize)]
struct ConnectionFile {
    connection: ConnectionRecord,
}

#[derive(Debug, Deserialize)]
struct ConnectionRecord {
    code: Option<String>,
    name: Option<String>,
    #[serde(default)]
    default: bool,
    server: Option<ServerRecord>,
}

#[derive(Debug, Deserialize)]
struct ServerRecord {
    dialect: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    userid: Option<String>,
    password: Option<String>,
    #[serde(default)]
    use_ssl: bool,
    default_query: Option<String>,
}

/// Reads and validates one descriptor file.
///
/// `fallback_code` (the registry directory name) is used when the file
/// omits its own code.
pub(crate) fn parse_descriptor_file(path: &Path, fallback_code: &str) -> Result<ConnectionDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DbQueryError::malformed(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_descriptor_toml(&content, fallback_code, path)
}

fn parse_descriptor_toml(
    content: &str,
    fallback_code: &str,
    origin: &Path,
) -> Result<ConnectionDescriptor> {
    let file: ConnectionFile = toml::from_str(content).map_err(|e| {
        DbQueryError::malformed(format!("{}:\n  {e}", origin.display()))
    })?;

    let record = file.connection;
    let server = record.server.ok_or_else(|| {
        DbQueryError::malformed(format!(
            "missing [connection.server] table in {}",
            origin.display()
        ))
    })?;

    let dialect_str = server
        .dialect
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            DbQueryError::malformed(format!(
                "missing field 'dialect' in {}",
                origin.display()
            ))
        })?;
    let dialect = Dialect::parse(dialect_str)
        .ok_or_else(|| DbQueryError::UnsupportedDialect(dialect_str.to_string()))?;

    let host = server.host.filter(|h| !h.trim().is_empty());
    if !dialect.is_file_based() && host.is_none() {
        return Err(DbQueryError::malformed(format!(
            "missing field 'host' for {dialect} connection in {}",
            origin.display()
        )));
    }

    let code = record
        .code
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| fallback_code.to_string());
    let name = record.name.unwrap_or_else(|| code.clone());

    Ok(ConnectionDescriptor {
        code,
        name,
        dialect,
        host,
        port: server.port,
        database: server.database,
        userid: server.userid,
        password: server.password,
        use_ssl: server.use_ssl,
        is_default: record.default,
        default_query: server.default_query,
    })
}
