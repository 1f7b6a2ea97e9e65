use std::io;
use std::path::{Component, Path};

use scriptdepot_core::db::unix_timestamp_millis;
use serde::Serialize;
use tracing::{error, info};

use super::BackupEngine;
use super::artifact::SnapshotArtifact;
use crate::error::{DepotError, DepotResult};
use crate::model::{ProjectMeta, ScriptRecord, validate_project_id};

/// Outcome of a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Artifact path relative to the backup root.
    pub location: String,
    pub restored: usize,
    pub skipped: usize,
    pub total: usize,
}

impl BackupEngine {
    /// Merge an artifact into `project_id` without touching existing scripts.
    ///
    /// With no `location` the newest indexed snapshot of `project_id` is used.
    /// Scripts whose name is already live, or repeated earlier in the same
    /// artifact, are skipped. All inserts commit as one unit.
    pub async fn restore(
        &self,
        project_id: &str,
        location: Option<&str>,
    ) -> DepotResult<RestoreReport> {
        validate_project_id(project_id)?;

        let location = match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(explicit) => explicit.to_string(),
            None => {
                self.store
                    .latest_snapshot_entry(project_id)
                    .await?
                    .ok_or_else(|| DepotError::NoBackupFound(project_id.to_string()))?
                    .artifact_location
            }
        };
        check_relative(&location)?;

        let path = self.root.join(&location);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(DepotError::BackupFileMissing(location)),
            Err(e) if is_absent(&e) => return Err(DepotError::BackupFileMissing(location)),
            Err(e) => {
                error!(project_id, path = %path.display(), error = %e, "Failed to stat snapshot artifact");
                return Err(e.into());
            }
        }
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if is_absent(&e) => return Err(DepotError::BackupFileMissing(location)),
            Err(e) => {
                error!(project_id, path = %path.display(), error = %e, "Failed to read snapshot artifact");
                return Err(e.into());
            }
        };
        let artifact = SnapshotArtifact::from_slice(&bytes)?;

        let now = unix_timestamp_millis();
        let total = artifact.scripts.len();
        let records: Vec<ScriptRecord> = artifact
            .scripts
            .into_iter()
            .map(|script| script.into_record(project_id, now))
            .collect();

        let written = {
            let _guard = self.locks.write(project_id).await;
            if self.store.get_project_meta(project_id).await?.is_none() {
                self.store
                    .upsert_project_meta(&ProjectMeta::auto_created(project_id, now))
                    .await?;
            }
            self.store.insert_scripts(&records).await?
        };

        let restored = usize::try_from(written).unwrap_or(total).min(total);
        let skipped = total - restored;

        info!(
            project_id,
            location = %location,
            restored,
            skipped,
            total,
            "Project restored"
        );

        Ok(RestoreReport {
            location,
            restored,
            skipped,
            total,
        })
    }
}

/// Accept only plain relative paths, so a location can never leave the
/// backup root.
/// The location names nothing readable: gone, or a path through a non-directory.
fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

fn check_relative(location: &str) -> DepotResult<()> {
    let path = Path::new(location);
    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    let named = path.components().any(|c| matches!(c, Component::Normal(_)));
    if !plain || !named {
        return Err(DepotError::InvalidRequest(format!(
            "backup_path must be relative to the backup directory: {location}"
        )));
    }
    Ok(())
}
