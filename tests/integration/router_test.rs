//! Query routing, safety gate, and output formatting, end to end.

use pretty_assertions::assert_eq;
use rb_dbquery::{DbQueryError, OutputFormat, QueryOutcome, QueryRequest};
use tempfile::TempDir;

use super::common::{router, seed_items_db, write_descriptor, write_sqlite_descriptor};

/// Sets up a registry with one sqlite connection over `rows` seeded rows.
async fn sqlite_fixture(root: &TempDir, rows: i64) -> String {
    let db_path = root.path().join("data").join("test.db");
    seed_items_db(&db_path, rows).await;
    let code = "db-test-sqlite";
    write_sqlite_descriptor(root, code, &db_path.to_string_lossy());
    code.to_string()
}

#[tokio::test]
async fn test_denylisted_statement_blocks_before_any_connection() {
    // Registry record resolves to a server that does not exist; the blocked
    // error proves no connection was attempted.
    let root = TempDir::new().unwrap();
    write_descriptor(
        &root,
        "db-sales-postgres",
        r#"
[connection]
code = "db-sales-postgres"

[connection.server]
dialect = "postgresql"
host = "db.local"
database = "sales"
"#,
    );

    let err = router(&root)
        .run(&QueryRequest::new("db-sales-postgres", "DELETE FROM orders"))
        .await
        .unwrap_err();

    assert!(matches!(err, DbQueryError::BlockedStatement { ref keyword } if keyword == "DELETE"));
    assert!(err.to_string().contains("DELETE"));
}

#[tokio::test]
async fn test_mixed_case_keyword_blocks() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 1).await;

    let err = router(&root)
        .run(&QueryRequest::new(code, "UpDaTe items SET label = 'x'"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbQueryError::BlockedStatement { ref keyword } if keyword == "UPDATE"));
}

#[tokio::test]
async fn test_keyword_inside_identifier_executes() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 1).await;

    // `updated_at` must not trip the UPDATE keyword.
    let out = router(&root)
        .run(&QueryRequest::new(
            code,
            "SELECT label AS updated_at FROM items",
        ))
        .await
        .unwrap();
    assert!(out.contains("updated_at"));
}

#[tokio::test]
async fn test_show_tables_matches_canonical_statement() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 1).await;
    let rt = router(&root);

    let rewritten = rt
        .run(&QueryRequest::new(code.as_str(), "SHOW TABLES"))
        .await
        .unwrap();
    let canonical = rt
        .run(&QueryRequest::new(
            code.as_str(),
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        ))
        .await
        .unwrap();

    assert_eq!(rewritten, canonical);
    assert!(rewritten.contains("items"));
}

#[tokio::test]
async fn test_list_tables_alias() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 1).await;

    let out = router(&root)
        .run(&QueryRequest::new(code, "list tables"))
        .await
        .unwrap();
    assert!(out.contains("items"));
}

#[tokio::test]
async fn test_truncation_at_max_rows() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 12).await;

    let outcome = router(&root)
        .execute(&QueryRequest::new(code, "SELECT id FROM items ORDER BY id").with_max_rows(5))
        .await
        .unwrap();

    let QueryOutcome::Rows(result) = outcome else {
        panic!("expected a result set");
    };
    assert_eq!(result.row_count, 5);
    assert_eq!(result.rows.len(), 5);
    assert!(result.was_truncated);
}

#[tokio::test]
async fn test_truncation_notice_in_every_format() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 12).await;
    let rt = router(&root);

    for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv] {
        let out = rt
            .run(
                &QueryRequest::new(code.as_str(), "SELECT id FROM items ORDER BY id")
                    .with_format(format)
                    .with_max_rows(5),
            )
            .await
            .unwrap();
        assert!(
            out.contains("[Showing 5 of more rows."),
            "{format} output missing truncation notice"
        );
    }
}

#[tokio::test]
async fn test_no_truncation_notice_under_cutoff() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 3).await;
    let rt = router(&root);

    for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv] {
        let out = rt
            .run(
                &QueryRequest::new(code.as_str(), "SELECT id FROM items ORDER BY id")
                    .with_format(format)
                    .with_max_rows(5),
            )
            .await
            .unwrap();
        assert!(!out.contains("[Showing"), "{format} output has stray notice");
    }
}

#[tokio::test]
async fn test_json_output_round_trips_values() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 2).await;

    let out = router(&root)
        .run(
            &QueryRequest::new(code, "SELECT id, label, price FROM items ORDER BY id")
                .with_format(OutputFormat::Json),
        )
        .await
        .unwrap();

    let parsed: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0]["id"], serde_json::json!(1));
    assert_eq!(parsed[0]["label"], serde_json::json!("item-0"));
    assert_eq!(parsed[0]["price"], serde_json::json!(0.5));
    assert_eq!(parsed[1]["label"], serde_json::json!("item-1"));
}

#[tokio::test]
async fn test_csv_output_has_header_row() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 2).await;

    let out = router(&root)
        .run(
            &QueryRequest::new(code, "SELECT id, label FROM items ORDER BY id")
                .with_format(OutputFormat::Csv),
        )
        .await
        .unwrap();

    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("id,label"));
    assert_eq!(lines.next(), Some("1,item-0"));
    assert_eq!(lines.next(), Some("2,item-1"));
}

#[tokio::test]
async fn test_table_output_has_summary_line() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 3).await;

    let out = router(&root)
        .run(&QueryRequest::new(code, "SELECT id FROM items ORDER BY id"))
        .await
        .unwrap();
    assert!(out.ends_with("3 row(s)"));
}

#[tokio::test]
async fn test_empty_result_reports_no_results() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 3).await;

    let out = router(&root)
        .run(&QueryRequest::new(code, "SELECT id FROM items WHERE id < 0"))
        .await
        .unwrap();
    assert_eq!(out, "Query executed successfully (no results returned).");
}

#[tokio::test]
async fn test_query_error_carries_driver_message() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 1).await;

    let err = router(&root)
        .run(&QueryRequest::new(code, "SELECT * FROM no_such_table"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbQueryError::Query(_)));
    assert!(err.to_string().contains("no_such_table"));
}

#[tokio::test]
async fn test_missing_database_file_is_file_not_found() {
    let root = TempDir::new().unwrap();
    write_sqlite_descriptor(&root, "db-gone-sqlite", "/nonexistent/gone.db");

    let err = router(&root)
        .run(&QueryRequest::new("db-gone-sqlite", "SELECT 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbQueryError::FileNotFound(_)));
}

#[tokio::test]
async fn test_consecutive_invocations_are_independent() {
    let root = TempDir::new().unwrap();
    let code = sqlite_fixture(&root, 2).await;
    let rt = router(&root);

    for _ in 0..3 {
        let out = rt
            .run(&QueryRequest::new(code.as_str(), "SELECT id FROM items ORDER BY id"))
            .await
            .unwrap();
        assert!(out.ends_with("2 row(s)"));
    }
}
