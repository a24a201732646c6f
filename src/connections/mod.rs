//! Connection registry: resolving and enumerating configured connections.

mod registry;

pub use registry::{ConnectionRegistry, SAMPLE_CONNECTION_CODE};

use crate::db::Dialect;

/// The parsed, validated record identifying how to reach one database.
///
/// Immutable after construction. Persistence of the underlying descriptor
/// files belongs to the host product; this crate only reads them.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    /// Unique connection code (registry directory name).
    pub code: String,

    /// Human-readable connection name.
    pub name: String,

    /// Database dialect.
    pub dialect: Dialect,

    /// Server host; `None` for file-based dialects.
    pub host: Option<String>,

    /// Server port; `None` means the dialect default.
    pub port: Option<u16>,

    /// Database name, or file path for file-based dialects.
    pub database: Option<String>,

    /// Login user.
    pub userid: Option<String>,

    /// Login password.
    pub password: Option<String>,

    /// Whether to require TLS on the server connection.
    pub use_ssl: bool,

    /// Whether this is the registry's designated default connection.
    pub is_default: bool,

    /// Optional starter query configured alongside the connection.
    pub default_query: Option<String>,
}

impl ConnectionDescriptor {
    /// Returns the effective port, applying the dialect default.
    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or_else(|| self.dialect.default_port())
    }

    /// Returns a display-safe summary (no credentials).
    pub fn display_string(&self) -> String {
        format!("{} ({})", self.code, self.dialect)
    }
}

/// One entry from [`ConnectionRegistry::list_all`].
///
/// A malformed record degrades to an inline error annotation instead of
/// failing the whole enumeration.
#[derive(Debug, Clone)]
pub struct ListedConnection {
    /// Connection code (registry directory name).
    pub code: String,

    /// The resolved descriptor, or the per-item error.
    pub detail: ListedDetail,
}

/// Outcome of resolving one registry entry during enumeration.
#[derive(Debug, Clone)]
pub enum ListedDetail {
    /// The descriptor parsed and validated.
    Resolved(ConnectionDescriptor),

    /// The record is present but unusable; carries the error text.
    Invalid(String),
}

impl ListedConnection {
    pub(crate) fn resolved(descriptor: ConnectionDescriptor) -> Self {
        Self {
            code: descriptor.code.clone(),
            detail: ListedDetail::Resolved(descriptor),
        }
    }

    pub(crate) fn invalid(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: ListedDetail::Invalid(error.into()),
        }
    }

    /// Renders the entry as one listing line.
    pub fn summary(&self) -> String {
        match &self.detail {
            ListedDetail::Resolved(desc) => desc.display_string(),
            ListedDetail::Invalid(err) => format!("{} (error: {})", self.code, err),
        }
    }

    /// Returns the descriptor if this entry resolved.
    pub fn descriptor(&self) -> Option<&ConnectionDescriptor> {
        match &self.detail {
            ListedDetail::Resolved(desc) => Some(desc),
            ListedDetail::Invalid(_) => None,
        }
    }
}
