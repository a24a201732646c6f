//! Read-only statement gate.
//!
//! Rejects statements containing denylisted keywords before any registry or
//! driver contact. Enforcement is by policy, not by transaction isolation:
//! the gate is the only thing standing between a caller and a write, so it
//! runs first and unconditionally.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DbQueryError, Result};

/// Statement keywords whose presence blocks execution, matched as
/// case-insensitive whole words.
pub const DENYLIST: [&str; 11] = [
    "DELETE", "DROP", "TRUNCATE", "UPDATE", "ALTER", "INSERT", "CREATE", "GRANT", "REVOKE",
    "EXEC", "EXECUTE",
];

fn denylist_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?i)\b({})\b", DENYLIST.join("|"));
        Regex::new(&pattern).expect("denylist pattern is valid")
    })
}

/// Checks a statement against the denylist.
///
/// Fails with [`DbQueryError::BlockedStatement`] naming the first matched
/// keyword. The reserved table-listing literals are not SQL and must be
/// recognized by the caller before this check.
pub fn check_statement(sql: &str) -> Result<()> {
    if let Some(caps) = denylist_regex().captures(sql) {
        let keyword = caps
            .get(1)
            .map(|m| m.as_str().to_uppercase())
            .unwrap_or_default();
        return Err(DbQueryError::blocked(keyword));
    }
    Ok(())
}

/// Returns true for the reserved `SHOW TABLES` / `LIST TABLES` literals,
/// which are rewritten to a dialect-specific statement instead of being
/// executed as SQL.
pub fn is_table_listing_request(sql: &str) -> bool {
    matches!(
        sql.trim().to_uppercase().as_str(),
        "SHOW TABLES" | "LIST TABLES"
    )
}

/// Returns true for the reserved `LIST CONNECTIONS` / `SHOW CONNECTIONS`
/// literals, which enumerate the registry instead of running a query.
pub fn is_connection_listing_request(sql: &str) -> bool {
    matches!(
        sql.trim().to_uppercase().as_str(),
        "LIST CONNECTIONS" | "SHOW CONNECTIONS"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_passes() {
        assert!(check_statement("SELECT * FROM Customers LIMIT 10").is_ok());
    }

    #[test]
    fn test_every_denylisted_keyword_blocks() {
        for keyword in DENYLIST {
            let sql = format!("{keyword} something");
            let err = check_statement(&sql).unwrap_err();
            assert!(
                matches!(err, DbQueryError::BlockedStatement { keyword: ref k } if k == keyword),
                "expected {keyword} to block"
            );
        }
    }

    #[test]
    fn test_blocking_is_case_insensitive() {
        for sql in ["update t set x=1", "UPDATE t SET x=1", "UpDaTe t SeT x=1"] {
            let err = check_statement(sql).unwrap_err();
            assert!(matches!(err, DbQueryError::BlockedStatement { ref keyword } if keyword == "UPDATE"));
        }
    }

    #[test]
    fn test_keyword_inside_identifier_passes() {
        assert!(check_statement("SELECT updated_at FROM orders").is_ok());
        assert!(check_statement("SELECT * FROM grants_summary").is_ok());
        assert!(check_statement("SELECT dropped, created FROM audit").is_ok());
    }

    #[test]
    fn test_keyword_anywhere_in_statement_blocks() {
        let err = check_statement("SELECT 1; DELETE FROM orders").unwrap_err();
        assert!(matches!(err, DbQueryError::BlockedStatement { ref keyword } if keyword == "DELETE"));
    }

    #[test]
    fn test_execute_reported_in_full() {
        let err = check_statement("EXECUTE sp_help").unwrap_err();
        assert!(matches!(err, DbQueryError::BlockedStatement { ref keyword } if keyword == "EXECUTE"));
    }

    #[test]
    fn test_table_listing_literals() {
        assert!(is_table_listing_request("SHOW TABLES"));
        assert!(is_table_listing_request("  list tables  "));
        assert!(!is_table_listing_request("SHOW TABLES LIKE 'x'"));
    }

    #[test]
    fn test_connection_listing_literals() {
        assert!(is_connection_listing_request("LIST CONNECTIONS"));
        assert!(is_connection_listing_request("show connections"));
        assert!(!is_connection_listing_request("SELECT 1"));
    }
}
