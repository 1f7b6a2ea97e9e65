use std::io;
use std::path::Path;

use scriptdepot_core::db::unix_timestamp_millis;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use super::BackupEngine;
use super::artifact::SnapshotArtifact;
use crate::error::{DepotError, DepotResult};
use crate::model::{ProjectMeta, SnapshotIndexEntry, validate_project_id};

/// Outcome of a successful snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    /// Artifact path relative to the backup root.
    pub location: String,
    pub file_name: String,
    pub scripts_captured: usize,
    /// Size of the persisted file.
    pub size_bytes: u64,
    pub created_at: i64,
}

impl BackupEngine {
    /// Write a full snapshot of `project_id` and record it in the index.
    ///
    /// Fails with `NotFound` when the project has neither metadata nor
    /// scripts. Nothing is recorded unless the artifact is on disk.
    pub async fn snapshot(&self, project_id: &str) -> DepotResult<SnapshotReport> {
        validate_project_id(project_id)?;

        let (meta, scripts) = {
            let _guard = self.locks.read(project_id).await;
            let meta = self.store.get_project_meta(project_id).await?;
            let scripts = self.store.list_scripts(project_id).await?;
            (meta, scripts)
        };

        let meta = match meta {
            Some(meta) => meta,
            None if scripts.is_empty() => {
                return Err(DepotError::NotFound(format!(
                    "Project '{project_id}' not found"
                )));
            }
            None => {
                let meta = ProjectMeta::auto_created(project_id, unix_timestamp_millis());
                self.store.upsert_project_meta(&meta).await?;
                meta
            }
        };

        let created_at = unix_timestamp_millis();
        let file_name = format!("{project_id}_backup_{created_at}_{}.json", short_suffix());
        let bytes = SnapshotArtifact::new(project_id, created_at, &meta, &scripts)
            .to_json_bytes()
            .map_err(io::Error::other)?;

        let dir = self.root.join(project_id);
        let size_bytes = write_artifact(&dir, &file_name, &bytes)
            .await
            .inspect_err(|e| {
                error!(project_id, dir = %dir.display(), error = %e, "Failed to write snapshot artifact");
            })?;

        let location = format!("{project_id}/{file_name}");
        let entry = SnapshotIndexEntry {
            project_id: project_id.to_string(),
            artifact_location: location.clone(),
            created_at,
            size_bytes: i64::try_from(size_bytes).unwrap_or(i64::MAX),
            scripts_count: i64::try_from(scripts.len()).unwrap_or(i64::MAX),
        };

        if let Err(e) = self.store.commit_snapshot(&entry).await {
            error!(project_id, location = %location, error = %e, "Failed to record snapshot");
            if let Err(rm) = tokio::fs::remove_file(dir.join(&file_name)).await {
                warn!(location = %location, error = %rm, "Could not remove unrecorded artifact");
            }
            return Err(e.into());
        }

        info!(
            project_id,
            location = %location,
            scripts = scripts.len(),
            size_bytes,
            "Snapshot created"
        );

        Ok(SnapshotReport {
            location,
            file_name,
            scripts_captured: scripts.len(),
            size_bytes,
            created_at,
        })
    }
}

fn short_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Durably publish `bytes` as `dir/file_name`, never replacing an existing file.
///
/// The data is written and fsynced under a temporary name, then hard-linked
/// into place. Returns the on-disk size of the published file.
async fn write_artifact(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<u64> {
    tokio::fs::create_dir_all(dir).await?;

    let final_path = dir.join(file_name);
    let tmp_path = dir.join(format!(".{file_name}.tmp"));

    let published = async {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::hard_link(&tmp_path, &final_path).await
    }
    .await;

    if let Err(e) = tokio::fs::remove_file(&tmp_path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %tmp_path.display(), error = %e, "Could not remove temporary artifact");
        }
    }
    published?;

    Ok(tokio::fs::metadata(&final_path).await?.len())
}
