//! Error types for rb-dbquery.
//!
//! Defines the single error enum surfaced to callers. Every failure is
//! terminal for one invocation; nothing here is retried.

use thiserror::Error;

/// Main error type for query routing operations.
#[derive(Error, Debug)]
pub enum DbQueryError {
    /// No connection with the requested code exists in the registry.
    #[error("Connection not found: {0}")]
    NotFound(String),

    /// A descriptor file exists but is missing required fields or fails to parse.
    #[error("Malformed connection config: {0}")]
    MalformedConfig(String),

    /// The statement contains a denylisted keyword and was rejected before
    /// any driver contact.
    #[error("BLOCKED: destructive SQL detected ({keyword}). This tool is read-only; only SELECT queries are allowed.")]
    BlockedStatement { keyword: String },

    /// The descriptor names a dialect outside the supported set.
    #[error("Unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    /// The dialect is recognized but its driver was not compiled in.
    #[error("Driver unavailable for {dialect}: {hint}")]
    DriverUnavailable { dialect: &'static str, hint: String },

    /// A file-based database (sqlite, duckdb) points at a path that does not exist.
    #[error("Database file not found: {0}")]
    FileNotFound(String),

    /// The driver rejected the statement; carries the driver message verbatim.
    #[error("Query error: {0}")]
    Query(String),

    /// The request itself is unusable (empty connection code, zero max_rows,
    /// unknown output format).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DbQueryError {
    /// Creates a not-found error for the given connection code.
    pub fn not_found(code: impl Into<String>) -> Self {
        Self::NotFound(code.into())
    }

    /// Creates a malformed-config error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedConfig(msg.into())
    }

    /// Creates a blocked-statement error naming the offending keyword.
    pub fn blocked(keyword: impl Into<String>) -> Self {
        Self::BlockedStatement {
            keyword: keyword.into(),
        }
    }

    /// Creates a driver-unavailable error with a remediation hint.
    pub fn driver_unavailable(dialect: &'static str, hint: impl Into<String>) -> Self {
        Self::DriverUnavailable {
            dialect,
            hint: hint.into(),
        }
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an invalid-request error with the given message.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Connection Not Found",
            Self::MalformedConfig(_) => "Malformed Config",
            Self::BlockedStatement { .. } => "Blocked Statement",
            Self::UnsupportedDialect(_) => "Unsupported Dialect",
            Self::DriverUnavailable { .. } => "Driver Unavailable",
            Self::FileNotFound(_) => "File Not Found",
            Self::Query(_) => "Query Error",
            Self::InvalidRequest(_) => "Invalid Request",
        }
    }
}

/// Result type alias using DbQueryError.
pub type Result<T> = std::result::Result<T, DbQueryError>;
