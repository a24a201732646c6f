//! Query routing: request types, the router, and output formatting.

mod format;
mod router;

pub use format::OutputFormat;
pub use router::{QueryOutcome, QueryRouter};

/// Default row cutoff applied when a request does not specify one.
pub const DEFAULT_MAX_ROWS: usize = 50;

/// One query invocation against a configured connection.
///
/// Created per invocation; has no persistent identity.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Code of the connection to query.
    pub connection_code: String,

    /// SQL text, or one of the reserved literals (`SHOW TABLES`,
    /// `LIST TABLES`, `LIST CONNECTIONS`, `SHOW CONNECTIONS`).
    pub sql: String,

    /// Output rendering.
    pub format: OutputFormat,

    /// Row cutoff, at least 1.
    pub max_rows: usize,
}

impl QueryRequest {
    /// Creates a request with the default table format and row cutoff.
    pub fn new(connection_code: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            connection_code: connection_code.into(),
            sql: sql.into(),
            format: OutputFormat::Table,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Sets the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the row cutoff.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = QueryRequest::new("db-sales", "SELECT 1");
        assert_eq!(request.connection_code, "db-sales");
        assert_eq!(request.format, OutputFormat::Table);
        assert_eq!(request.max_rows, DEFAULT_MAX_ROWS);
    }

    #[test]
    fn test_request_builders() {
        let request = QueryRequest::new("db-sales", "SELECT 1")
            .with_format(OutputFormat::Json)
            .with_max_rows(10);
        assert_eq!(request.format, OutputFormat::Json);
        assert_eq!(request.max_rows, 10);
    }
}
