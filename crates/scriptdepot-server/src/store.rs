//! The narrow storage interface the snapshot and restore engines depend on.

use async_trait::async_trait;
use scriptdepot_core::db::DatabaseError;

use crate::model::{ProjectMeta, ScriptRecord, SnapshotIndexEntry};

/// Durable keyed storage for scripts, project metadata and the snapshot index.
///
/// Implementations must make `insert_script` and `insert_scripts` behave as
/// insert-if-absent on `(project_id, name)`.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    async fn get_project_meta(&self, project_id: &str)
    -> Result<Option<ProjectMeta>, DatabaseError>;

    /// Insert or update name, description and `updated_at`.
    /// `backup_count` and `created_at` of an existing row are kept.
    async fn upsert_project_meta(&self, meta: &ProjectMeta) -> Result<(), DatabaseError>;

    /// All scripts of a project in creation order.
    async fn list_scripts(&self, project_id: &str) -> Result<Vec<ScriptRecord>, DatabaseError>;

    async fn script_exists(&self, project_id: &str, name: &str) -> Result<bool, DatabaseError>;

    /// Returns `false` if a script with the same name already exists.
    async fn insert_script(&self, record: &ScriptRecord) -> Result<bool, DatabaseError>;

    /// Insert-if-absent for every record as one unit. Returns rows written.
    async fn insert_scripts(&self, records: &[ScriptRecord]) -> Result<u64, DatabaseError>;

    async fn increment_backup_count(&self, project_id: &str) -> Result<(), DatabaseError>;

    async fn append_snapshot_entry(&self, entry: &SnapshotIndexEntry) -> Result<(), DatabaseError>;

    async fn latest_snapshot_entry(
        &self,
        project_id: &str,
    ) -> Result<Option<SnapshotIndexEntry>, DatabaseError>;

    /// Record a written artifact and bump the project's backup count.
    async fn commit_snapshot(&self, entry: &SnapshotIndexEntry) -> Result<(), DatabaseError> {
        self.append_snapshot_entry(entry).await?;
        self.increment_backup_count(&entry.project_id).await
    }
}
