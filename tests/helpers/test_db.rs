use support_router::infrastructure::persistence::Database;
use uuid::Uuid;

/// File-backed sqlite database, unique per test so tests can run in parallel.
pub async fn setup_test_db() -> Database {
    let path = std::env::temp_dir().join(format!("support_router_test_{}.db", Uuid::new_v4()));
    let db_url = format!("sqlite://{}?mode=rwc", path.display());

    let db = Database::connect_with_pool_size(&db_url, 5, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations()
        .await
        .expect("Failed to run migrations on test database");

    db
}
