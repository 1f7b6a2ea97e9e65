//! Snapshot and restore engines.
//!
//! Both depend only on [`ScriptStore`], never on the concrete database.

mod artifact;
mod restore;
mod snapshot;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use artifact::{ArtifactProjectMeta, ArtifactScript, FORMAT_VERSION, SnapshotArtifact};
pub use restore::RestoreReport;
pub use snapshot::SnapshotReport;

use crate::locks::ProjectLocks;
use crate::store::ScriptStore;

/// Creates snapshot artifacts under a backup root and restores from them.
#[derive(Clone)]
pub struct BackupEngine {
    store: Arc<dyn ScriptStore>,
    locks: ProjectLocks,
    root: PathBuf,
}

impl BackupEngine {
    pub fn new(store: Arc<dyn ScriptStore>, locks: ProjectLocks, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            locks,
            root: root.into(),
        }
    }

    /// Directory every artifact location is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
