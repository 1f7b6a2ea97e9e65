//! `ScriptStore` backed by the `SQLite` database.

use async_trait::async_trait;
use scriptdepot_core::db::unix_timestamp_millis;
use sqlx::{Sqlite, Transaction};

use crate::model::{ProjectMeta, ScriptRecord, SnapshotIndexEntry};
use crate::store::ScriptStore;

use super::db::{DatabaseError, DepotDatabase};
use super::models::{BackupRow, ScriptRow};

const INSERT_IF_ABSENT: &str = "INSERT INTO scripts (id, name, content, script_kind, project_id, metadata, created_at, updated_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)
     ON CONFLICT(project_id, name) DO NOTHING";

/// Insert `record` unless its `(project_id, name)` is taken. Returns whether a row was written.
pub(super) async fn insert_if_absent(
    tx: &mut Transaction<'_, Sqlite>,
    record: &ScriptRecord,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(INSERT_IF_ABSENT)
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.content)
        .bind(record.script_kind.as_str())
        .bind(&record.project_id)
        .bind(&record.metadata)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn bump_backup_count(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: &str,
) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        "UPDATE projects SET backup_count = backup_count + 1, updated_at = ? WHERE id = ?",
    )
    .bind(unix_timestamp_millis())
    .bind(project_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Project '{project_id}'")));
    }
    Ok(())
}

async fn insert_backup_row(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &SnapshotIndexEntry,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO backups (project_id, backup_path, created_at, size_bytes, scripts_count)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&entry.project_id)
    .bind(&entry.artifact_location)
    .bind(entry.created_at)
    .bind(entry.size_bytes)
    .bind(entry.scripts_count)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ScriptStore for DepotDatabase {
    async fn get_project_meta(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectMeta>, DatabaseError> {
        self.get_project(project_id).await
    }

    async fn upsert_project_meta(&self, meta: &ProjectMeta) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO projects (id, name, description, created_at, updated_at, backup_count)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                updated_at = excluded.updated_at",
        )
        .bind(&meta.id)
        .bind(&meta.name)
        .bind(&meta.description)
        .bind(meta.created_at)
        .bind(meta.updated_at)
        .bind(meta.backup_count)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_scripts(&self, project_id: &str) -> Result<Vec<ScriptRecord>, DatabaseError> {
        sqlx::query_as::<_, ScriptRow>(
            "SELECT * FROM scripts WHERE project_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(ScriptRecord::try_from)
        .collect()
    }

    async fn script_exists(&self, project_id: &str, name: &str) -> Result<bool, DatabaseError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM scripts WHERE project_id = ? AND name = ?")
                .bind(project_id)
                .bind(name)
                .fetch_optional(self.pool())
                .await?;
        Ok(found.is_some())
    }

    async fn insert_script(&self, record: &ScriptRecord) -> Result<bool, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let inserted = insert_if_absent(&mut tx, record).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn insert_scripts(&self, records: &[ScriptRecord]) -> Result<u64, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let mut written = 0;
        for record in records {
            if insert_if_absent(&mut tx, record).await? {
                written += 1;
            }
        }
        tx.commit().await?;
        Ok(written)
    }

    async fn increment_backup_count(&self, project_id: &str) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;
        bump_backup_count(&mut tx, project_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_snapshot_entry(&self, entry: &SnapshotIndexEntry) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;
        insert_backup_row(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn latest_snapshot_entry(
        &self,
        project_id: &str,
    ) -> Result<Option<SnapshotIndexEntry>, DatabaseError> {
        let row = sqlx::query_as::<_, BackupRow>(
            "SELECT project_id, backup_path, created_at, size_bytes, scripts_count
             FROM backups WHERE project_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(project_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(SnapshotIndexEntry::from))
    }

    /// Index entry and count change commit together or not at all.
    async fn commit_snapshot(&self, entry: &SnapshotIndexEntry) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;
        insert_backup_row(&mut tx, entry).await?;
        bump_backup_count(&mut tx, &entry.project_id).await?;
        tx.commit().await?;
        Ok(())
    }
}
