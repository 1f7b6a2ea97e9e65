//! The eight script tools, shared by the REST routes and `/mcp/function`.
//!
//! Every operation takes a proof minted by the verifier. Reads take a
//! [`Verified`] checked against [`ToolService::access`]; writes take a
//! [`Fresh`], which only a signed, in-window request can produce.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scriptdepot_auth::{Access, Fresh, Verified};
use scriptdepot_core::db::unix_timestamp_millis;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backup::BackupEngine;
use crate::error::{DepotError, DepotResult};
use crate::locks::ProjectLocks;
use crate::model::{
    DEFAULT_PROJECT, ProjectMeta, ProjectStats, ScriptKind, ScriptRecord, SnapshotIndexEntry,
    validate_project_id, validate_script_name,
};
use crate::storage::DepotDatabase;
use crate::validate::{ValidationReport, lint};

const CREATED_BY: &str = r#"{"created_by":"scriptdepot"}"#;

/// Tool identifiers, as used in `/mcp/function` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    CreateScript,
    ListScripts,
    UpdateScript,
    DeleteScript,
    GetProjectStatus,
    ValidateScript,
    BackupProject,
    RestoreProject,
}

impl Tool {
    pub const ALL: [Self; 8] = [
        Self::CreateScript,
        Self::ListScripts,
        Self::UpdateScript,
        Self::DeleteScript,
        Self::GetProjectStatus,
        Self::ValidateScript,
        Self::BackupProject,
        Self::RestoreProject,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateScript => "create_script",
            Self::ListScripts => "list_scripts",
            Self::UpdateScript => "update_script",
            Self::DeleteScript => "delete_script",
            Self::GetProjectStatus => "get_project_status",
            Self::ValidateScript => "validate_script",
            Self::BackupProject => "backup_project",
            Self::RestoreProject => "restore_project",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Tools that change the store or the backup directory.
    pub const fn is_mutating(self) -> bool {
        !matches!(
            self,
            Self::ListScripts | Self::GetProjectStatus | Self::ValidateScript
        )
    }
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateScriptRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScriptRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteScriptRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// Request naming only a project; used by list, status and backup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateScriptRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreProjectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateScriptResponse {
    pub success: bool,
    pub message: String,
    pub script_id: String,
    pub name: String,
    pub script_type: ScriptKind,
    pub project_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub id: String,
    pub name: String,
    pub script_type: ScriptKind,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListScriptsResponse {
    pub success: bool,
    pub project_id: String,
    pub scripts: Vec<ScriptSummary>,
    pub count: usize,
    pub listed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateScriptResponse {
    pub success: bool,
    pub message: String,
    pub script_id: String,
    pub name: String,
    pub project_id: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteScriptResponse {
    pub success: bool,
    pub message: String,
    pub script_id: String,
    pub name: String,
    pub project_id: String,
    pub deleted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatusResponse {
    pub success: bool,
    pub project: ProjectInfo,
    pub statistics: ProjectStats,
    pub latest_backup: Option<SnapshotIndexEntry>,
    pub status: String,
    pub checked_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateScriptResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ValidationReport,
    pub validated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupProjectResponse {
    pub success: bool,
    pub message: String,
    /// Relative to the server's backup directory.
    pub backup_path: String,
    pub backup_filename: String,
    pub project_id: String,
    pub scripts_backed_up: usize,
    pub backup_size_bytes: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreProjectResponse {
    pub success: bool,
    pub message: String,
    pub backup_path: String,
    pub project_id: String,
    pub scripts_restored: usize,
    pub scripts_skipped: usize,
    pub total_scripts_in_backup: usize,
    pub restored_at: i64,
}

/// Output of any tool, for `/mcp/function`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Created(CreateScriptResponse),
    Listed(ListScriptsResponse),
    Updated(UpdateScriptResponse),
    Deleted(DeleteScriptResponse),
    Status(Box<ProjectStatusResponse>),
    Validated(ValidateScriptResponse),
    BackedUp(BackupProjectResponse),
    Restored(RestoreProjectResponse),
}

// =============================================================================
// Service
// =============================================================================

fn project_or_default(project_id: Option<String>) -> DepotResult<String> {
    let project = project_id
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROJECT.to_string());
    validate_project_id(&project)?;
    Ok(project)
}

fn require_content(content: &str) -> DepotResult<()> {
    if content.is_empty() {
        return Err(DepotError::InvalidRequest("Script content is required".into()));
    }
    Ok(())
}

fn parse_params<T: DeserializeOwned + Default>(params: serde_json::Value) -> DepotResult<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params)
        .map_err(|e| DepotError::InvalidRequest(format!("Invalid parameters: {e}")))
}

#[derive(Clone)]
pub struct ToolService {
    db: DepotDatabase,
    locks: ProjectLocks,
    backups: BackupEngine,
    sign_reads: bool,
}

impl ToolService {
    pub fn new(db: DepotDatabase, backup_root: impl Into<PathBuf>, sign_reads: bool) -> Self {
        let locks = ProjectLocks::new();
        let backups = BackupEngine::new(Arc::new(db.clone()), locks.clone(), backup_root);
        Self {
            db,
            locks,
            backups,
            sign_reads,
        }
    }

    /// What a request must prove before `tool` runs.
    pub const fn access(&self, tool: Tool) -> Access {
        if tool.is_mutating() {
            Access::for_writes()
        } else {
            Access::for_reads(self.sign_reads)
        }
    }

    pub const fn database(&self) -> &DepotDatabase {
        &self.db
    }

    pub fn backup_root(&self) -> &Path {
        self.backups.root()
    }

    pub async fn create_script(
        &self,
        _proof: &Fresh,
        req: CreateScriptRequest,
    ) -> DepotResult<CreateScriptResponse> {
        validate_script_name(&req.name)?;
        require_content(&req.content)?;
        let project_id = project_or_default(req.project_id)?;
        let kind = req.script_type.unwrap_or_default();

        let record = ScriptRecord::new(
            &project_id,
            &req.name,
            &req.content,
            kind,
            CREATED_BY.to_string(),
            unix_timestamp_millis(),
        );

        let created = {
            let _guard = self.locks.write(&project_id).await;
            self.db.create_script(&record).await?
        };
        let Some(created) = created else {
            return Err(DepotError::Conflict(format!(
                "Script with name '{}' already exists in project '{project_id}'",
                req.name
            )));
        };

        info!(project_id = %project_id, name = %created.name, id = %created.id, "Script created");

        Ok(CreateScriptResponse {
            success: true,
            message: format!("Script '{}' created successfully", created.name),
            script_id: created.id,
            name: created.name,
            script_type: created.script_kind,
            project_id,
            created_at: created.created_at,
        })
    }

    pub async fn list_scripts(
        &self,
        _proof: &Verified,
        req: ProjectRequest,
    ) -> DepotResult<ListScriptsResponse> {
        let project_id = project_or_default(req.project_id)?;
        let scripts: Vec<ScriptSummary> = self
            .db
            .list_scripts_recent(&project_id)
            .await?
            .into_iter()
            .map(|s| ScriptSummary {
                id: s.id,
                name: s.name,
                script_type: s.script_kind,
                created_at: s.created_at,
                updated_at: s.updated_at,
            })
            .collect();

        debug!(project_id = %project_id, count = scripts.len(), "Listed scripts");

        Ok(ListScriptsResponse {
            success: true,
            project_id,
            count: scripts.len(),
            scripts,
            listed_at: unix_timestamp_millis(),
        })
    }

    pub async fn update_script(
        &self,
        _proof: &Fresh,
        req: UpdateScriptRequest,
    ) -> DepotResult<UpdateScriptResponse> {
        validate_script_name(&req.name)?;
        require_content(&req.content)?;
        let project_id = project_or_default(req.project_id)?;

        let updated = {
            let _guard = self.locks.write(&project_id).await;
            self.db
                .update_script_content(&project_id, &req.name, &req.content)
                .await?
        };

        info!(project_id = %project_id, name = %updated.name, "Script updated");

        Ok(UpdateScriptResponse {
            success: true,
            message: format!("Script '{}' updated successfully", updated.name),
            script_id: updated.id,
            name: updated.name,
            project_id,
            updated_at: updated.updated_at,
        })
    }

    pub async fn delete_script(
        &self,
        _proof: &Fresh,
        req: DeleteScriptRequest,
    ) -> DepotResult<DeleteScriptResponse> {
        validate_script_name(&req.name)?;
        let project_id = project_or_default(req.project_id)?;

        let deleted = {
            let _guard = self.locks.write(&project_id).await;
            self.db.delete_script(&project_id, &req.name).await?
        };

        info!(project_id = %project_id, name = %deleted.name, "Script deleted");

        Ok(DeleteScriptResponse {
            success: true,
            message: format!("Script '{}' deleted successfully", deleted.name),
            script_id: deleted.id,
            name: deleted.name,
            project_id,
            deleted_at: unix_timestamp_millis(),
        })
    }

    /// Project metadata and statistics.
    ///
    /// A signed query creates an unknown project; an unsigned one only sees
    /// placeholder metadata and writes nothing.
    pub async fn get_project_status(
        &self,
        proof: &Verified,
        req: ProjectRequest,
    ) -> DepotResult<ProjectStatusResponse> {
        let project_id = project_or_default(req.project_id)?;
        let meta = if proof.access().requires_signature() {
            self.db.ensure_project(&project_id).await?
        } else {
            match self.db.get_project(&project_id).await? {
                Some(meta) => meta,
                None => ProjectMeta::auto_created(&project_id, unix_timestamp_millis()),
            }
        };
        let statistics = self.db.project_stats(&project_id).await?;
        let latest_backup = self.db.list_snapshot_entries(&project_id).await?.into_iter().next();

        Ok(ProjectStatusResponse {
            success: true,
            project: ProjectInfo {
                id: meta.id,
                name: meta.name,
                description: meta.description,
                created_at: meta.created_at,
                updated_at: meta.updated_at,
            },
            statistics,
            latest_backup,
            status: "active".to_string(),
            checked_at: unix_timestamp_millis(),
        })
    }

    #[allow(clippy::unused_self)]
    pub fn validate_script(
        &self,
        _proof: &Verified,
        req: ValidateScriptRequest,
    ) -> DepotResult<ValidateScriptResponse> {
        let content = req
            .content
            .ok_or_else(|| DepotError::InvalidRequest("Script content is required".into()))?;
        let report = lint(&content, req.script_type.unwrap_or_default());

        debug!(valid = report.valid, warnings = report.warnings.len(), "Script validated");

        Ok(ValidateScriptResponse {
            success: true,
            report,
            validated_at: unix_timestamp_millis(),
        })
    }

    pub async fn backup_project(
        &self,
        _proof: &Fresh,
        req: ProjectRequest,
    ) -> DepotResult<BackupProjectResponse> {
        let project_id = project_or_default(req.project_id)?;
        let report = self.backups.snapshot(&project_id).await?;

        Ok(BackupProjectResponse {
            success: true,
            message: format!("Project '{project_id}' backed up successfully"),
            backup_path: report.location,
            backup_filename: report.file_name,
            project_id,
            scripts_backed_up: report.scripts_captured,
            backup_size_bytes: report.size_bytes,
            created_at: report.created_at,
        })
    }

    pub async fn restore_project(
        &self,
        _proof: &Fresh,
        req: RestoreProjectRequest,
    ) -> DepotResult<RestoreProjectResponse> {
        let project_id = req
            .project_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| DepotError::InvalidRequest("project_id is required".into()))?;
        let report = self
            .backups
            .restore(&project_id, req.backup_path.as_deref())
            .await?;

        Ok(RestoreProjectResponse {
            success: true,
            message: format!("Project '{project_id}' restored from backup"),
            backup_path: report.location,
            project_id,
            scripts_restored: report.restored,
            scripts_skipped: report.skipped,
            total_scripts_in_backup: report.total,
            restored_at: unix_timestamp_millis(),
        })
    }

    /// Run `tool` with JSON `params`. A `null` params value means "no parameters".
    pub async fn dispatch(
        &self,
        proof: &Fresh,
        tool: Tool,
        params: serde_json::Value,
    ) -> DepotResult<ToolOutput> {
        Ok(match tool {
            Tool::CreateScript => {
                ToolOutput::Created(self.create_script(proof, parse_params(params)?).await?)
            }
            Tool::ListScripts => {
                ToolOutput::Listed(self.list_scripts(proof, parse_params(params)?).await?)
            }
            Tool::UpdateScript => {
                ToolOutput::Updated(self.update_script(proof, parse_params(params)?).await?)
            }
            Tool::DeleteScript => {
                ToolOutput::Deleted(self.delete_script(proof, parse_params(params)?).await?)
            }
            Tool::GetProjectStatus => ToolOutput::Status(Box::new(
                self.get_project_status(proof, parse_params(params)?).await?,
            )),
            Tool::ValidateScript => {
                ToolOutput::Validated(self.validate_script(proof, parse_params(params)?)?)
            }
            Tool::BackupProject => {
                ToolOutput::BackedUp(self.backup_project(proof, parse_params(params)?).await?)
            }
            Tool::RestoreProject => {
                ToolOutput::Restored(self.restore_project(proof, parse_params(params)?).await?)
            }
        })
    }
}
