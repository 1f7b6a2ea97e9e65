//! Row types for scriptdepot storage.

use std::str::FromStr;

use crate::model::{ProjectMeta, ScriptKind, ScriptRecord, SnapshotIndexEntry};

use super::db::DatabaseError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct ScriptRow {
    pub id: String,
    pub name: String,
    pub content: String,
    pub script_kind: String,
    pub project_id: String,
    pub metadata: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<ScriptRow> for ScriptRecord {
    type Error = DatabaseError;

    fn try_from(row: ScriptRow) -> Result<Self, Self::Error> {
        let script_kind = ScriptKind::from_str(&row.script_kind).map_err(|_| {
            DatabaseError::CorruptRow(format!(
                "script {} has unknown kind '{}'",
                row.id, row.script_kind
            ))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            content: row.content,
            script_kind,
            project_id: row.project_id,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct ProjectRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub backup_count: i64,
}

impl From<ProjectRow> for ProjectMeta {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
            backup_count: row.backup_count,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct BackupRow {
    pub project_id: String,
    pub backup_path: String,
    pub created_at: i64,
    pub size_bytes: i64,
    pub scripts_count: i64,
}

impl From<BackupRow> for SnapshotIndexEntry {
    fn from(row: BackupRow) -> Self {
        Self {
            project_id: row.project_id,
            artifact_location: row.backup_path,
            created_at: row.created_at,
            size_bytes: row.size_bytes,
            scripts_count: row.scripts_count,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct StatsRow {
    pub total_scripts: i64,
    pub lua_scripts: i64,
    pub luau_scripts: i64,
    pub last_updated: Option<i64>,
    pub project_created: Option<i64>,
}
