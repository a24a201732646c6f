//! Shared fixtures: temporary registries and seeded sqlite databases.

use std::fs;
use std::path::Path;

use rb_dbquery::{ConnectionRegistry, QueryRouter, RegistrySettings};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tempfile::TempDir;

/// Builds a router over a registry rooted in `root`.
pub fn router(root: &TempDir) -> QueryRouter {
    QueryRouter::new(ConnectionRegistry::new(settings(root)))
}

/// Registry settings rooted in `root`.
pub fn settings(root: &TempDir) -> RegistrySettings {
    RegistrySettings::new(root.path().join("connections"), root.path().join("db"))
}

/// Writes one registry descriptor under `connections/<code>/<code>.toml`.
pub fn write_descriptor(root: &TempDir, code: &str, body: &str) {
    let dir = root.path().join("connections").join(code);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{code}.toml")), body).unwrap();
}

/// Registers a sqlite connection pointing at `db_path`.
pub fn write_sqlite_descriptor(root: &TempDir, code: &str, db_path: &str) {
    write_descriptor(
        root,
        code,
        &format!(
            r#"
[connection]
code = "{code}"

[connection.server]
dialect = "sqlite"
database = "{db_path}"
"#
        ),
    );
}

/// Creates a sqlite database at `path` with an `items` table of `rows` rows.
pub async fn seed_items_db(path: &Path, rows: i64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await.unwrap();
    sqlx::query("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, price REAL)")
        .execute(&pool)
        .await
        .unwrap();
    for i in 0..rows {
        sqlx::query("INSERT INTO items (label, price) VALUES (?, ?)")
            .bind(format!("item-{i}"))
            .bind(i as f64 + 0.5)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;
}
