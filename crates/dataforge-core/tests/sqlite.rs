//! A fill pass against a real SQLite file through `SqlStore`.

use std::collections::BTreeSet;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use dataforge_core::error::Result;
use dataforge_core::fill::{run_fill, FillSettings};
use dataforge_core::generate::rules::RuleSet;
use dataforge_core::store::sql::SqlStore;
use dataforge_core::SchemaCatalog;

const SCHEMA: &[&str] = &[
    "CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        note TEXT
    )",
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        email VARCHAR(60) NOT NULL UNIQUE,
        first_name VARCHAR(40) NOT NULL
    )",
];

fn no_cycles(_: &BTreeSet<String>) -> Result<Vec<String>> {
    panic!("the schema has no dependency cycle")
}

#[tokio::test]
async fn test_fill_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");

    let setup = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap();
    for statement in SCHEMA {
        sqlx::query(statement).execute(&setup).await.unwrap();
    }
    sqlx::query("INSERT INTO users (email, first_name) VALUES ('taken@example.com', 'Ada')")
        .execute(&setup)
        .await
        .unwrap();
    setup.close().await;

    let mut store = SqlStore::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    let schema = store.introspect().await.unwrap();
    assert_eq!(schema.foreign_keys_of("orders").unwrap().len(), 1);
    assert!(schema.unique_columns_of("users").unwrap().contains(&"email".to_string()));

    let settings = FillSettings {
        rows: 5,
        seed: 3,
        ..FillSettings::default()
    };
    let report = run_fill(
        &schema,
        &mut store,
        &mut no_cycles,
        &RuleSet::builtin(),
        &settings,
        None,
    )
    .await
    .unwrap();
    store.close().await;

    assert_eq!(report.order.tables, vec!["users", "orders"]);

    let check = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(&path))
        .await
        .unwrap();
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&check)
        .await
        .unwrap();
    let distinct_emails: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT email) FROM users")
        .fetch_one(&check)
        .await
        .unwrap();
    let linked_orders: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id")
            .fetch_one(&check)
            .await
            .unwrap();
    let long_names: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE length(first_name) > 40")
            .fetch_one(&check)
            .await
            .unwrap();

    assert_eq!(users, 6);
    assert_eq!(distinct_emails, 6);
    assert_eq!(linked_orders, 5);
    assert_eq!(long_names, 0);
}
