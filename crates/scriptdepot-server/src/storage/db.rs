//! Database connection and initialization.

pub use scriptdepot_core::db::DatabaseError;

scriptdepot_core::define_database!(DepotDatabase, "Depot database migrations complete");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = DepotDatabase::open_in_memory().await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn open_on_disk_runs_migrations() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = DepotDatabase::open(&dir.path().join("depot.db")).await.unwrap();
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        for expected in ["backups", "projects", "scripts"] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }
}
