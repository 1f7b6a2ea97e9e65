//! On-disk snapshot artifact format.
//!
//! A pretty-printed camelCase JSON document. Fields other than `name` and
//! `content` are optional on read so hand-edited artifacts still restore.

use serde::{Deserialize, Serialize};

use crate::error::DepotError;
use crate::model::{ProjectMeta, ScriptKind, ScriptRecord};

pub const FORMAT_VERSION: u32 = 1;

const fn default_format_version() -> u32 {
    FORMAT_VERSION
}

fn empty_metadata() -> String {
    "{}".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotArtifact {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub project_id: String,
    pub created_at: i64,
    #[serde(default)]
    pub project_meta: Option<ArtifactProjectMeta>,
    pub scripts: Vec<ArtifactScript>,
    #[serde(default)]
    pub scripts_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProjectMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub backup_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactScript {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub script_kind: ScriptKind,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "empty_metadata")]
    pub metadata: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl From<&ProjectMeta> for ArtifactProjectMeta {
    fn from(meta: &ProjectMeta) -> Self {
        Self {
            id: meta.id.clone(),
            name: meta.name.clone(),
            description: meta.description.clone(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            backup_count: meta.backup_count,
        }
    }
}

impl From<&ScriptRecord> for ArtifactScript {
    fn from(record: &ScriptRecord) -> Self {
        Self {
            name: record.name.clone(),
            content: record.content.clone(),
            script_kind: record.script_kind,
            project_id: Some(record.project_id.clone()),
            metadata: record.metadata.clone(),
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
        }
    }
}

impl ArtifactScript {
    /// Turn into a live record of `project_id`, keeping the original
    /// timestamps when present and stamping `now` otherwise.
    pub fn into_record(self, project_id: &str, now: i64) -> ScriptRecord {
        let mut record = ScriptRecord::new(
            project_id,
            &self.name,
            &self.content,
            self.script_kind,
            self.metadata,
            now,
        );
        record.created_at = self.created_at.unwrap_or(now);
        record.updated_at = self.updated_at.unwrap_or(now);
        record
    }
}

impl SnapshotArtifact {
    pub fn new(
        project_id: &str,
        created_at: i64,
        meta: &ProjectMeta,
        scripts: &[ScriptRecord],
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            project_id: project_id.to_string(),
            created_at,
            project_meta: Some(meta.into()),
            scripts: scripts.iter().map(ArtifactScript::from).collect(),
            scripts_count: scripts.len(),
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse and sanity-check an artifact.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DepotError> {
        let artifact: Self = serde_json::from_slice(bytes)
            .map_err(|e| DepotError::InvalidArtifact(e.to_string()))?;

        if artifact.format_version > FORMAT_VERSION {
            return Err(DepotError::InvalidArtifact(format!(
                "unsupported format version {}",
                artifact.format_version
            )));
        }
        if let Some(pos) = artifact.scripts.iter().position(|s| s.name.trim().is_empty()) {
            return Err(DepotError::InvalidArtifact(format!(
                "script at index {pos} has an empty name"
            )));
        }
        Ok(artifact)
    }
}
