//! Read-only query routing.
//!
//! One invocation resolves the connection, opens the dialect client, runs a
//! single statement, and releases the client on every exit path. No state
//! survives a request.

use tracing::{debug, warn};

use crate::connections::ConnectionRegistry;
use crate::db::{self, QueryResult};
use crate::error::{DbQueryError, Result};
use crate::query::format;
use crate::query::QueryRequest;
use crate::safety;

/// Outcome of executing one request.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The statement produced a result set.
    Rows(QueryResult),

    /// The statement produced no column metadata.
    NoResultSet,
}

/// Routes validated read-only queries to the dialect-appropriate client.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    registry: ConnectionRegistry,
}

impl QueryRouter {
    /// Creates a router over the given registry.
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Creates a router from environment configuration.
    pub fn from_env() -> Self {
        Self::new(ConnectionRegistry::from_env())
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Runs one request and renders the outcome in the requested format.
    ///
    /// The reserved `LIST CONNECTIONS` / `SHOW CONNECTIONS` literals return
    /// the registry listing instead of running a query.
    pub async fn run(&self, request: &QueryRequest) -> Result<String> {
        if safety::is_connection_listing_request(&request.sql) {
            return Ok(self.registry.render_connection_list());
        }

        match self.execute(request).await? {
            QueryOutcome::Rows(result) => Ok(format::render(&result, request.format)),
            QueryOutcome::NoResultSet => Ok(format::NO_RESULTS_MESSAGE.to_string()),
        }
    }

    /// Executes one request and returns the raw outcome.
    ///
    /// The denylist gate runs before the registry or any driver is touched;
    /// a blocked statement never causes a connection attempt.
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        if request.connection_code.trim().is_empty() {
            return Err(DbQueryError::request(
                "connection code is required. Use \"LIST CONNECTIONS\" to see available connections.",
            ));
        }
        if request.max_rows == 0 {
            return Err(DbQueryError::request("max_rows must be at least 1"));
        }

        let table_listing = safety::is_table_listing_request(&request.sql);
        if !table_listing {
            safety::check_statement(&request.sql)?;
        }

        let descriptor = self.registry.resolve(&request.connection_code)?;
        let sql = if table_listing {
            descriptor.dialect.table_listing_sql()
        } else {
            request.sql.as_str()
        };

        debug!(
            code = %descriptor.code,
            dialect = %descriptor.dialect,
            "executing read-only query"
        );

        let client = db::connect(&descriptor).await?;
        let result = client.execute_query(sql, request.max_rows).await;
        if let Err(e) = client.close().await {
            warn!(code = %descriptor.code, error = %e, "failed to close connection");
        }
        let result = result?;

        if result.columns.is_empty() && result.rows.is_empty() {
            return Ok(QueryOutcome::NoResultSet);
        }
        Ok(QueryOutcome::Rows(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistrySettings;
    use tempfile::TempDir;

    fn empty_router(root: &TempDir) -> QueryRouter {
        QueryRouter::new(ConnectionRegistry::new(RegistrySettings::new(
            root.path().join("connections"),
            root.path().join("db"),
        )))
    }

    #[tokio::test]
    async fn test_empty_connection_code_is_invalid() {
        let root = TempDir::new().unwrap();
        let err = empty_router(&root)
            .execute(&QueryRequest::new("", "SELECT 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbQueryError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_zero_max_rows_is_invalid() {
        let root = TempDir::new().unwrap();
        let err = empty_router(&root)
            .execute(&QueryRequest::new("db-x", "SELECT 1").with_max_rows(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbQueryError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_blocked_statement_precedes_resolution() {
        // The connection does not exist; a blocked error (not NotFound)
        // proves the gate runs first.
        let root = TempDir::new().unwrap();
        let err = empty_router(&root)
            .execute(&QueryRequest::new("db-missing", "DROP TABLE users"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbQueryError::BlockedStatement { ref keyword } if keyword == "DROP"));
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let root = TempDir::new().unwrap();
        let err = empty_router(&root)
            .execute(&QueryRequest::new("db-missing", "SELECT 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbQueryError::NotFound(ref c) if c == "db-missing"));
    }

    #[tokio::test]
    async fn test_list_connections_literal_bypasses_execution() {
        let root = TempDir::new().unwrap();
        let out = empty_router(&root)
            .run(&QueryRequest::new("", "list connections"))
            .await
            .unwrap();
        assert!(out.starts_with("No database connections found."));
    }
}
