//! Snapshot and restore engine tests.

use std::sync::Arc;

use async_trait::async_trait;
use scriptdepot_core::db::DatabaseError;
use tempfile::TempDir;

use super::{BackupEngine, SnapshotArtifact};
use crate::error::DepotError;
use crate::locks::ProjectLocks;
use crate::model::{ProjectMeta, ScriptKind, ScriptRecord, SnapshotIndexEntry};
use crate::storage::DepotDatabase;
use crate::store::ScriptStore;

struct Fixture {
    db: DepotDatabase,
    engine: BackupEngine,
    dir: TempDir,
}

async fn fixture() -> Fixture {
    let db = DepotDatabase::open_in_memory().await.unwrap();
    let dir = TempDir::new().unwrap();
    let engine = BackupEngine::new(
        Arc::new(db.clone()),
        ProjectLocks::new(),
        dir.path().join("backups"),
    );
    Fixture { db, engine, dir }
}

async fn add(db: &DepotDatabase, project: &str, name: &str, content: &str, kind: ScriptKind) {
    let record = ScriptRecord::new(project, name, content, kind, "{}".into(), 1_000);
    assert!(db.create_script(&record).await.unwrap().is_some());
}

async fn live(db: &DepotDatabase, project: &str) -> Vec<(String, String, ScriptKind)> {
    let mut scripts: Vec<_> = db
        .list_scripts(project)
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.name, s.content, s.script_kind))
        .collect();
    scripts.sort();
    scripts
}

// === Snapshot ===

#[tokio::test]
async fn snapshot_writes_artifact_and_records_it() {
    let f = fixture().await;
    add(&f.db, "game", "Main", "print('hi')", ScriptKind::Lua).await;
    add(&f.db, "game", "Util", "return {}", ScriptKind::Luau).await;

    let report = f.engine.snapshot("game").await.unwrap();

    assert_eq!(report.scripts_captured, 2);
    assert!(report.location.starts_with("game/game_backup_"));
    assert!(report.file_name.ends_with(".json"));

    let path = f.engine.root().join(&report.location);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), report.size_bytes);

    let artifact = SnapshotArtifact::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(artifact.project_id, "game");
    assert_eq!(artifact.scripts_count, 2);
    assert_eq!(artifact.created_at, report.created_at);

    let entry = f.db.latest_snapshot_entry("game").await.unwrap().unwrap();
    assert_eq!(entry.artifact_location, report.location);
    assert_eq!(entry.scripts_count, 2);
    assert_eq!(f.db.get_project("game").await.unwrap().unwrap().backup_count, 1);
}

#[tokio::test]
async fn snapshot_of_unknown_project_is_not_found() {
    let f = fixture().await;
    let err = f.engine.snapshot("nothing-here").await.unwrap_err();
    assert!(matches!(err, DepotError::NotFound(_)));
    assert!(!f.engine.root().join("nothing-here").exists());
}

#[tokio::test]
async fn snapshot_of_empty_known_project_succeeds() {
    let f = fixture().await;
    f.db.ensure_project("empty").await.unwrap();
    let report = f.engine.snapshot("empty").await.unwrap();
    assert_eq!(report.scripts_captured, 0);
}

#[tokio::test]
async fn snapshot_creates_missing_metadata() {
    let f = fixture().await;
    let orphan = ScriptRecord::new("orphan", "A", "x", ScriptKind::Lua, "{}".into(), 1);
    assert!(f.db.insert_script(&orphan).await.unwrap());
    assert!(f.db.get_project("orphan").await.unwrap().is_none());

    f.engine.snapshot("orphan").await.unwrap();

    let meta = f.db.get_project("orphan").await.unwrap().unwrap();
    assert_eq!(meta.backup_count, 1);
}

#[tokio::test]
async fn snapshot_rejects_unsafe_project_id() {
    let f = fixture().await;
    let err = f.engine.snapshot("../escape").await.unwrap_err();
    assert!(matches!(err, DepotError::InvalidRequest(_)));
}

#[tokio::test]
async fn snapshot_io_failure_leaves_no_accounting() {
    let f = fixture().await;
    add(&f.db, "game", "Main", "x", ScriptKind::Lua).await;

    // The backup root is a regular file, so the project directory cannot be created.
    let blocked = f.dir.path().join("blocked");
    std::fs::write(&blocked, b"not a directory").unwrap();
    let engine = BackupEngine::new(Arc::new(f.db.clone()), ProjectLocks::new(), &blocked);

    let err = engine.snapshot("game").await.unwrap_err();
    assert!(matches!(err, DepotError::Io(_)));
    assert!(f.db.latest_snapshot_entry("game").await.unwrap().is_none());
    assert_eq!(f.db.get_project("game").await.unwrap().unwrap().backup_count, 0);
}

#[tokio::test]
async fn consecutive_snapshots_get_distinct_files() {
    let f = fixture().await;
    add(&f.db, "game", "Main", "x", ScriptKind::Lua).await;
    let a = f.engine.snapshot("game").await.unwrap();
    let b = f.engine.snapshot("game").await.unwrap();
    assert_ne!(a.location, b.location);
    assert_eq!(f.db.list_snapshot_entries("game").await.unwrap().len(), 2);
    assert_eq!(f.db.get_project("game").await.unwrap().unwrap().backup_count, 2);
}

// === Restore ===

#[tokio::test]
async fn round_trip_after_deleting_everything() {
    let f = fixture().await;
    add(&f.db, "game", "Main", "print(1)", ScriptKind::Lua).await;
    add(&f.db, "game", "Util", "return 2", ScriptKind::Luau).await;
    add(&f.db, "game", "Ui", "-- ui", ScriptKind::Lua).await;
    let before = live(&f.db, "game").await;

    f.engine.snapshot("game").await.unwrap();
    for (name, _, _) in &before {
        f.db.delete_script("game", name).await.unwrap();
    }
    assert!(live(&f.db, "game").await.is_empty());

    let report = f.engine.restore("game", None).await.unwrap();
    assert_eq!((report.restored, report.skipped, report.total), (3, 0, 3));
    assert_eq!(live(&f.db, "game").await, before);
}

#[tokio::test]
async fn restore_into_another_empty_project() {
    let f = fixture().await;
    add(&f.db, "src", "Main", "print(1)", ScriptKind::Luau).await;
    let snap = f.engine.snapshot("src").await.unwrap();

    let report = f.engine.restore("dst", Some(&snap.location)).await.unwrap();
    assert_eq!(report.restored, 1);
    assert_eq!(
        live(&f.db, "dst").await,
        vec![("Main".to_string(), "print(1)".to_string(), ScriptKind::Luau)]
    );
    assert!(f.db.get_project("dst").await.unwrap().is_some());
}

#[tokio::test]
async fn second_restore_is_a_no_op() {
    let f = fixture().await;
    add(&f.db, "game", "A", "a", ScriptKind::Lua).await;
    add(&f.db, "game", "B", "b", ScriptKind::Lua).await;
    let snap = f.engine.snapshot("game").await.unwrap();

    let first = f.engine.restore("copy", Some(&snap.location)).await.unwrap();
    assert_eq!((first.restored, first.skipped), (2, 0));
    let second = f.engine.restore("copy", Some(&snap.location)).await.unwrap();
    assert_eq!((second.restored, second.skipped, second.total), (0, 2, 2));
}

#[tokio::test]
async fn live_script_wins_over_artifact() {
    let f = fixture().await;
    add(&f.db, "game", "A", "new", ScriptKind::Lua).await;
    let snap = f.engine.snapshot("game").await.unwrap();
    f.db.update_script_content("game", "A", "old").await.unwrap();

    let report = f.engine.restore("game", Some(&snap.location)).await.unwrap();
    assert_eq!((report.restored, report.skipped), (0, 1));
    assert_eq!(f.db.get_script("game", "A").await.unwrap().content, "old");
}

#[tokio::test]
async fn restore_preserves_original_timestamps() {
    let f = fixture().await;
    add(&f.db, "game", "A", "a", ScriptKind::Lua).await;
    let original = f.db.get_script("game", "A").await.unwrap();
    let snap = f.engine.snapshot("game").await.unwrap();

    f.engine.restore("copy", Some(&snap.location)).await.unwrap();
    let copy = f.db.get_script("copy", "A").await.unwrap();
    assert_eq!(copy.created_at, original.created_at);
    assert_eq!(copy.updated_at, original.updated_at);
    assert_ne!(copy.id, original.id);
}

#[tokio::test]
async fn duplicate_names_in_artifact_restore_once() {
    let f = fixture().await;
    let dir = f.engine.root().join("hand");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("edited.json"),
        br#"{"projectId":"hand","createdAt":1,"scripts":[
            {"name":"A","content":"first"},
            {"name":"A","content":"second"},
            {"name":"B","content":"b"}
        ]}"#,
    )
    .unwrap();

    let report = f.engine.restore("target", Some("hand/edited.json")).await.unwrap();
    assert_eq!((report.restored, report.skipped, report.total), (2, 1, 3));
    assert_eq!(f.db.get_script("target", "A").await.unwrap().content, "first");
}

#[tokio::test]
async fn restore_without_index_is_no_backup_found() {
    let f = fixture().await;
    let err = f.engine.restore("game", None).await.unwrap_err();
    assert!(matches!(err, DepotError::NoBackupFound(p) if p == "game"));
}

#[tokio::test]
async fn restore_of_deleted_artifact_is_backup_file_missing() {
    let f = fixture().await;
    add(&f.db, "game", "A", "a", ScriptKind::Lua).await;
    let snap = f.engine.snapshot("game").await.unwrap();
    std::fs::remove_file(f.engine.root().join(&snap.location)).unwrap();

    let err = f.engine.restore("game", None).await.unwrap_err();
    assert!(matches!(err, DepotError::BackupFileMissing(loc) if loc == snap.location));
}

#[tokio::test]
async fn restore_of_directory_or_non_directory_parent_is_backup_file_missing() {
    let f = fixture().await;
    add(&f.db, "game", "A", "a", ScriptKind::Lua).await;
    let snap = f.engine.snapshot("game").await.unwrap();

    let through_file = format!("{}/inner.json", snap.location);
    for location in ["game", "./game", through_file.as_str()] {
        let err = f.engine.restore("copy", Some(location)).await.unwrap_err();
        assert!(!err.is_server_error(), "{location}: {err}");
        assert!(matches!(err, DepotError::BackupFileMissing(ref l) if l == location), "{location}");
    }
    assert!(f.db.list_scripts("copy").await.unwrap().is_empty());
}

#[tokio::test]
async fn restore_refuses_paths_outside_backup_root() {
    let f = fixture().await;
    std::fs::write(f.dir.path().join("secret.json"), b"{}").unwrap();
    for bad in ["../secret.json", "/etc/passwd"] {
        let err = f.engine.restore("game", Some(bad)).await.unwrap_err();
        assert!(matches!(err, DepotError::InvalidRequest(_)), "{bad}");
    }
}

#[tokio::test]
async fn malformed_artifact_writes_nothing() {
    let f = fixture().await;
    let dir = f.engine.root().join("game");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("broken.json"), b"{ this is not json").unwrap();

    let err = f.engine.restore("game", Some("game/broken.json")).await.unwrap_err();
    assert!(matches!(err, DepotError::InvalidArtifact(_)));
    assert!(f.db.get_project("game").await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_restores_insert_each_script_once() {
    let f = fixture().await;
    for name in ["A", "B", "C", "D"] {
        add(&f.db, "game", name, name, ScriptKind::Lua).await;
    }
    let snap = f.engine.snapshot("game").await.unwrap();

    let (a, b) = tokio::join!(
        f.engine.restore("copy", Some(&snap.location)),
        f.engine.restore("copy", Some(&snap.location)),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.restored + b.restored, 4);
    assert_eq!(a.skipped + b.skipped, 4);
    assert_eq!(live(&f.db, "copy").await.len(), 4);
}

// === Store failures ===

/// Store whose reads fail, to check that snapshot has no side effects.
struct BrokenStore;

#[async_trait]
impl ScriptStore for BrokenStore {
    async fn get_project_meta(&self, _: &str) -> Result<Option<ProjectMeta>, DatabaseError> {
        Ok(Some(ProjectMeta::auto_created("game", 1)))
    }
    async fn upsert_project_meta(&self, _: &ProjectMeta) -> Result<(), DatabaseError> {
        Ok(())
    }
    async fn list_scripts(&self, _: &str) -> Result<Vec<ScriptRecord>, DatabaseError> {
        Err(DatabaseError::Query("disk I/O error".into()))
    }
    async fn script_exists(&self, _: &str, _: &str) -> Result<bool, DatabaseError> {
        Ok(false)
    }
    async fn insert_script(&self, _: &ScriptRecord) -> Result<bool, DatabaseError> {
        Ok(false)
    }
    async fn insert_scripts(&self, _: &[ScriptRecord]) -> Result<u64, DatabaseError> {
        Ok(0)
    }
    async fn increment_backup_count(&self, _: &str) -> Result<(), DatabaseError> {
        panic!("must not be called")
    }
    async fn append_snapshot_entry(&self, _: &SnapshotIndexEntry) -> Result<(), DatabaseError> {
        panic!("must not be called")
    }
    async fn latest_snapshot_entry(
        &self,
        _: &str,
    ) -> Result<Option<SnapshotIndexEntry>, DatabaseError> {
        Ok(None)
    }
}

#[tokio::test]
async fn store_read_failure_writes_no_artifact() {
    let dir = TempDir::new().unwrap();
    let engine = BackupEngine::new(Arc::new(BrokenStore), ProjectLocks::new(), dir.path());

    let err = engine.snapshot("game").await.unwrap_err();
    assert!(matches!(err, DepotError::Store(_)));
    assert!(!dir.path().join("game").exists());
}
