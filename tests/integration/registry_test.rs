//! Registry enumeration and resolution, end to end.

use rb_dbquery::{DbQueryError, Dialect, ListedDetail, QueryRequest, SAMPLE_CONNECTION_CODE};
use tempfile::TempDir;

use super::common::{router, seed_items_db, write_descriptor, write_sqlite_descriptor};

#[tokio::test]
async fn test_list_connections_renders_registry() {
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
    write_sqlite_descriptor(&root, "db-app-sqlite", "/data/app.db");

    let out = router(&root)
        .run(&QueryRequest::new("", "LIST CONNECTIONS"))
        .await
        .unwrap();

    assert_eq!(
        out,
        "Available database connections:\n  db-app-sqlite (sqlite)\n  db-sales-postgres (postgresql)"
    );
}

#[tokio::test]
async fn test_show_connections_alias() {
    let root = TempDir::new().unwrap();
    let out = router(&root)
        .run(&QueryRequest::new("", "show connections"))
        .await
        .unwrap();
    assert!(out.starts_with("No database connections found."));
}

#[tokio::test]
async fn test_malformed_record_degrades_to_inline_error() {
    let root = TempDir::new().unwrap();
    write_sqlite_descriptor(&root, "db-app-sqlite", "/data/app.db");
    write_descriptor(
        &root,
        "db-broken",
        r#"
[connection]
code = "db-broken"

[connection.server]
host = "db.local"
"#,
    );

    let out = router(&root)
        .run(&QueryRequest::new("", "LIST CONNECTIONS"))
        .await
        .unwrap();

    assert!(out.contains("db-app-sqlite (sqlite)"));
    assert!(out.contains("db-broken (error:"));
}

#[tokio::test]
async fn test_sample_connection_appears_when_file_exists() {
    let root = TempDir::new().unwrap();
    let sample_path = root
        .path()
        .join("db")
        .join(SAMPLE_CONNECTION_CODE)
        .join("northwind.db");
    seed_items_db(&sample_path, 2).await;

    let rt = router(&root);
    let entries = rt.registry().list_all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].code, SAMPLE_CONNECTION_CODE);
    match &entries[0].detail {
        ListedDetail::Resolved(desc) => assert_eq!(desc.dialect, Dialect::Sqlite),
        ListedDetail::Invalid(e) => panic!("sample entry should resolve: {e}"),
    }

    // And it is queryable without any registry record.
    let out = rt
        .run(&QueryRequest::new(
            SAMPLE_CONNECTION_CODE,
            "SELECT id FROM items ORDER BY id",
        ))
        .await
        .unwrap();
    assert!(out.contains("2 row(s)"));
}

#[tokio::test]
async fn test_unknown_code_fails_without_driver_contact() {
    let root = TempDir::new().unwrap();
    let err = router(&root)
        .run(&QueryRequest::new("db-missing", "SELECT 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbQueryError::NotFound(ref c) if c == "db-missing"));
}
