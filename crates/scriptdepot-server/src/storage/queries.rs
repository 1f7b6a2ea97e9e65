//! Database queries used directly by the tool service.

use scriptdepot_core::db::unix_timestamp_millis;

use crate::model::{ProjectMeta, ProjectStats, ScriptRecord, SnapshotIndexEntry};

use super::db::{DatabaseError, DepotDatabase};
use super::models::{BackupRow, ProjectRow, ScriptRow, StatsRow};
use super::store_impl::insert_if_absent;

impl DepotDatabase {
    // =========================================================================
    // Project queries
    // =========================================================================

    /// Get a project's metadata, if the project has been seen.
    pub async fn get_project(&self, project_id: &str) -> Result<Option<ProjectMeta>, DatabaseError> {
        let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(ProjectMeta::from))
    }

    /// Get a project's metadata, creating a default row if absent.
    pub async fn ensure_project(&self, project_id: &str) -> Result<ProjectMeta, DatabaseError> {
        let meta = ProjectMeta::auto_created(project_id, unix_timestamp_millis());
        sqlx::query(
            "INSERT INTO projects (id, name, description, created_at, updated_at, backup_count)
             VALUES (?, ?, ?, ?, ?, 0)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&meta.id)
        .bind(&meta.name)
        .bind(&meta.description)
        .bind(meta.created_at)
        .bind(meta.updated_at)
        .execute(self.pool())
        .await?;

        self.get_project(project_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Project '{project_id}'")))
    }

    /// Script counts by kind, last update and number of snapshots taken.
    pub async fn project_stats(&self, project_id: &str) -> Result<ProjectStats, DatabaseError> {
        let stats = sqlx::query_as::<_, StatsRow>(
            "SELECT
                COUNT(*) AS total_scripts,
                COUNT(CASE WHEN script_kind = 'lua' THEN 1 END) AS lua_scripts,
                COUNT(CASE WHEN script_kind = 'luau' THEN 1 END) AS luau_scripts,
                MAX(updated_at) AS last_updated,
                MIN(created_at) AS project_created
             FROM scripts WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_one(self.pool())
        .await?;

        let backup_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM backups WHERE project_id = ?")
                .bind(project_id)
                .fetch_one(self.pool())
                .await?;

        Ok(ProjectStats {
            total_scripts: stats.total_scripts,
            lua_scripts: stats.lua_scripts,
            luau_scripts: stats.luau_scripts,
            backup_count,
            last_updated: stats.last_updated,
            project_created: stats.project_created,
        })
    }

    // =========================================================================
    // Script queries
    // =========================================================================

    /// Create a script and its project row in one transaction.
    ///
    /// Returns `None` if the name is already taken in the project.
    pub async fn create_script(
        &self,
        record: &ScriptRecord,
    ) -> Result<Option<ScriptRecord>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let inserted = insert_if_absent(&mut tx, record).await?;

        if !inserted {
            tx.rollback().await?;
            return Ok(None);
        }

        let meta = ProjectMeta::auto_created(&record.project_id, record.created_at);
        sqlx::query(
            "INSERT INTO projects (id, name, description, created_at, updated_at, backup_count)
             VALUES (?, ?, ?, ?, ?, 0)
             ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(&meta.id)
        .bind(&meta.name)
        .bind(&meta.description)
        .bind(meta.created_at)
        .bind(meta.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(record.clone()))
    }

    /// Get a script by project and name.
    pub async fn get_script(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ScriptRecord, DatabaseError> {
        sqlx::query_as::<_, ScriptRow>("SELECT * FROM scripts WHERE project_id = ? AND name = ?")
            .bind(project_id)
            .bind(name)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| {
                DatabaseError::NotFound(format!("Script '{name}' in project '{project_id}'"))
            })?
            .try_into()
    }

    /// Scripts of a project, most recently updated first.
    pub async fn list_scripts_recent(
        &self,
        project_id: &str,
    ) -> Result<Vec<ScriptRecord>, DatabaseError> {
        sqlx::query_as::<_, ScriptRow>(
            "SELECT * FROM scripts WHERE project_id = ? ORDER BY updated_at DESC, name ASC",
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(ScriptRecord::try_from)
        .collect()
    }

    /// Replace a script's content and bump `updated_at`.
    pub async fn update_script_content(
        &self,
        project_id: &str,
        name: &str,
        content: &str,
    ) -> Result<ScriptRecord, DatabaseError> {
        let now = unix_timestamp_millis();
        sqlx::query_as::<_, ScriptRow>(
            "UPDATE scripts SET content = ?, updated_at = ?
             WHERE project_id = ? AND name = ?
             RETURNING *",
        )
        .bind(content)
        .bind(now)
        .bind(project_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Script '{name}' in project '{project_id}'")))?
        .try_into()
    }

    /// Delete a script, returning the removed row.
    pub async fn delete_script(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ScriptRecord, DatabaseError> {
        sqlx::query_as::<_, ScriptRow>(
            "DELETE FROM scripts WHERE project_id = ? AND name = ? RETURNING *",
        )
        .bind(project_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Script '{name}' in project '{project_id}'")))?
        .try_into()
    }

    // =========================================================================
    // Snapshot index queries
    // =========================================================================

    /// Snapshot index entries for a project, newest first.
    pub async fn list_snapshot_entries(
        &self,
        project_id: &str,
    ) -> Result<Vec<SnapshotIndexEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, BackupRow>(
            "SELECT project_id, backup_path, created_at, size_bytes, scripts_count
             FROM backups WHERE project_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(SnapshotIndexEntry::from).collect())
    }
}
