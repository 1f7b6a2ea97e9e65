//! Domain types shared by the store, the backup engines and the tool service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DepotError;

/// Project used when a request names none.
pub const DEFAULT_PROJECT: &str = "default";

const MAX_PROJECT_ID_LEN: usize = 128;

/// Script dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    #[default]
    Lua,
    Luau,
}

impl ScriptKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lua => "lua",
            Self::Luau => "luau",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptKind {
    type Err = DepotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lua" => Ok(Self::Lua),
            "luau" => Ok(Self::Luau),
            other => Err(DepotError::InvalidRequest(format!(
                "Unsupported script type '{other}' (expected lua or luau)"
            ))),
        }
    }
}

/// A live script. Identity is `(project_id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    pub script_kind: ScriptKind,
    pub project_id: String,
    /// Free-form JSON object, stored as text.
    pub metadata: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ScriptRecord {
    /// A fresh record stamped at `now` with a new id.
    pub fn new(
        project_id: &str,
        name: &str,
        content: &str,
        script_kind: ScriptKind,
        metadata: String,
        now: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            content: content.to_string(),
            script_kind,
            project_id: project_id.to_string(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-project metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub backup_count: i64,
}

impl ProjectMeta {
    /// Metadata for a project that is first seen implicitly.
    pub fn auto_created(id: &str, now: i64) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Project {id}"),
            description: format!("Auto-created project {id}"),
            created_at: now,
            updated_at: now,
            backup_count: 0,
        }
    }
}

/// Append-only record of a written snapshot artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIndexEntry {
    pub project_id: String,
    /// Artifact path relative to the backup root.
    pub artifact_location: String,
    pub created_at: i64,
    pub size_bytes: i64,
    pub scripts_count: i64,
}

/// Aggregate counts for the project status tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total_scripts: i64,
    pub lua_scripts: i64,
    pub luau_scripts: i64,
    pub backup_count: i64,
    pub last_updated: Option<i64>,
    pub project_created: Option<i64>,
}

/// Check that `id` is safe to use as a directory name.
///
/// 1-128 characters from `[A-Za-z0-9_.-]`, and not `.` or `..`.
pub fn validate_project_id(id: &str) -> Result<(), DepotError> {
    if id.is_empty() || id.len() > MAX_PROJECT_ID_LEN {
        return Err(DepotError::InvalidRequest(format!(
            "project_id must be 1-{MAX_PROJECT_ID_LEN} characters"
        )));
    }
    if id == "." || id == ".." {
        return Err(DepotError::InvalidRequest(format!(
            "project_id '{id}' is reserved"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(DepotError::InvalidRequest(format!(
            "project_id '{id}' may only contain letters, digits, '_', '-' and '.'"
        )));
    }
    Ok(())
}

/// Script names only need to be present.
pub fn validate_script_name(name: &str) -> Result<(), DepotError> {
    if name.trim().is_empty() {
        return Err(DepotError::InvalidRequest("Script name is required".into()));
    }
    Ok(())
}
