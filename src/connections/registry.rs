//! Registry scanning and descriptor resolution.

use std::path::PathBuf;

use tracing::debug;

use crate::config::{self, RegistrySettings, CONNECTIONS_PATH_ENV};
use crate::db::Dialect;
use crate::error::{DbQueryError, Result};

use super::{ConnectionDescriptor, ListedConnection, ListedDetail};

/// Code of the built-in sample connection, available without a registry record.
pub const SAMPLE_CONNECTION_CODE: &str = "sample-northwind-sqlite";

/// File name of the sample database inside its samples subdirectory.
const SAMPLE_DB_FILE: &str = "northwind.db";

/// Maps connection codes to fully populated descriptors.
///
/// The registry is scanned fresh on every call; no state survives between
/// invocations.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    settings: RegistrySettings,
}

impl ConnectionRegistry {
    /// Creates a registry over the given locations.
    pub fn new(settings: RegistrySettings) -> Self {
        Self { settings }
    }

    /// Creates a registry from environment configuration.
    pub fn from_env() -> Self {
        Self::new(RegistrySettings::from_env())
    }

    /// Returns the registry locations.
    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Looks up and parses the descriptor for `code`.
    ///
    /// The built-in sample connection resolves without a registry record.
    pub fn resolve(&self, code: &str) -> Result<ConnectionDescriptor> {
        if code == SAMPLE_CONNECTION_CODE {
            return Ok(self.sample_descriptor());
        }

        let path = self.settings.descriptor_path(code);
        if !path.exists() {
            return Err(DbQueryError::not_found(code));
        }

        config::parse_descriptor_file(&path, code)
    }

    /// Enumerates every resolvable connection, lexicographically by code.
    ///
    /// A malformed record degrades to an inline error entry; the rest of the
    /// list still returns. Never fails, even when the registry directory is
    /// missing or empty.
    pub fn list_all(&self) -> Vec<ListedConnection> {
        let mut entries = Vec::new();

        if let Ok(dir) = std::fs::read_dir(&self.settings.connections_dir) {
            for entry in dir.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if !file_type.is_dir() {
                    continue;
                }
                let code = entry.file_name().to_string_lossy().into_owned();
                if !code.to_lowercase().starts_with("db-") {
                    continue;
                }
                // A directory without its descriptor file is not a record.
                if !self.settings.descriptor_path(&code).exists() {
                    continue;
                }
                match self.resolve(&code) {
                    Ok(descriptor) => entries.push(ListedConnection::resolved(descriptor)),
                    Err(e) => entries.push(ListedConnection::invalid(code, e.to_string())),
                }
            }
        } else {
            debug!(
                path = %self.settings.connections_dir.display(),
                "connections directory not readable"
            );
        }

        if self.sample_db_path().exists() {
            entries.push(ListedConnection::resolved(self.sample_descriptor()));
        }

        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }

    /// Returns the registry's designated default connection, if any.
    pub fn default_connection(&self) -> Option<ConnectionDescriptor> {
        self.list_all()
            .into_iter()
            .filter_map(|entry| match entry.detail {
                ListedDetail::Resolved(desc) if desc.is_default => Some(desc),
                _ => None,
            })
            .next()
    }

    /// Renders the `LIST CONNECTIONS` text listing.
    pub fn render_connection_list(&self) -> String {
        let entries = self.list_all();
        if entries.is_empty() {
            return format!(
                "No database connections found. Check {CONNECTIONS_PATH_ENV} or the configured connections directory."
            );
        }

        let mut out = String::from("Available database connections:\n");
        for entry in &entries {
            out.push_str("  ");
            out.push_str(&entry.summary());
            out.push('\n');
        }
        out.pop();
        out
    }

    fn sample_db_path(&self) -> PathBuf {
        self.settings
            .samples_dir
            .join(SAMPLE_CONNECTION_CODE)
            .join(SAMPLE_DB_FILE)
    }

    fn sample_descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            code: SAMPLE_CONNECTION_CODE.to_string(),
            name: "Sample Northwind (SQLite)".to_string(),
            dialect: Dialect::Sqlite,
            host: None,
            port: None,
            database: Some(self.sample_db_path().to_string_lossy().into_owned()),
            userid: None,
            password: None,
            use_ssl: false,
            is_default: false,
            default_query: None,
        }
    }
}
