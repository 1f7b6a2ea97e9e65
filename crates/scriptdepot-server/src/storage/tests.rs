//! Storage layer tests for scriptdepot.

use super::db::{DatabaseError, DepotDatabase};
use crate::model::{ProjectMeta, ScriptKind, ScriptRecord, SnapshotIndexEntry};
use crate::store::ScriptStore;

async fn test_db() -> DepotDatabase {
    DepotDatabase::open_in_memory().await.unwrap()
}

fn script(project: &str, name: &str, content: &str, at: i64) -> ScriptRecord {
    ScriptRecord::new(project, name, content, ScriptKind::Lua, "{}".into(), at)
}

fn entry(project: &str, location: &str, at: i64) -> SnapshotIndexEntry {
    SnapshotIndexEntry {
        project_id: project.into(),
        artifact_location: location.into(),
        created_at: at,
        size_bytes: 100,
        scripts_count: 1,
    }
}

// === Project tests ===

#[tokio::test]
async fn ensure_project_creates_once() {
    let db = test_db().await;
    let first = db.ensure_project("alpha").await.unwrap();
    let second = db.ensure_project("alpha").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.name, "Project alpha");
}

#[tokio::test]
async fn upsert_keeps_backup_count() {
    let db = test_db().await;
    db.ensure_project("alpha").await.unwrap();
    db.increment_backup_count("alpha").await.unwrap();

    let mut meta = ProjectMeta::auto_created("alpha", 5);
    meta.name = "Renamed".into();
    meta.backup_count = 0;
    db.upsert_project_meta(&meta).await.unwrap();

    let stored = db.get_project_meta("alpha").await.unwrap().unwrap();
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.backup_count, 1);
}

#[tokio::test]
async fn increment_backup_count_on_missing_project_fails() {
    let db = test_db().await;
    let err = db.increment_backup_count("ghost").await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

// === Script tests ===

#[tokio::test]
async fn create_script_also_creates_project() {
    let db = test_db().await;
    let created = db.create_script(&script("p", "Main", "print(1)", 1)).await.unwrap();
    assert!(created.is_some());
    assert!(db.get_project("p").await.unwrap().is_some());
}

#[tokio::test]
async fn create_script_refuses_duplicate_name() {
    let db = test_db().await;
    db.create_script(&script("p", "Main", "a", 1)).await.unwrap();
    let dup = db.create_script(&script("p", "Main", "b", 2)).await.unwrap();
    assert!(dup.is_none());
    assert_eq!(db.get_script("p", "Main").await.unwrap().content, "a");
}

#[tokio::test]
async fn same_name_allowed_in_different_projects() {
    let db = test_db().await;
    assert!(db.insert_script(&script("p1", "Main", "a", 1)).await.unwrap());
    assert!(db.insert_script(&script("p2", "Main", "b", 1)).await.unwrap());
}

#[tokio::test]
async fn insert_script_is_insert_if_absent() {
    let db = test_db().await;
    assert!(db.insert_script(&script("p", "A", "old", 1)).await.unwrap());
    assert!(!db.insert_script(&script("p", "A", "new", 2)).await.unwrap());
    assert_eq!(db.get_script("p", "A").await.unwrap().content, "old");
    assert!(db.script_exists("p", "A").await.unwrap());
    assert!(!db.script_exists("p", "B").await.unwrap());
}

#[tokio::test]
async fn insert_scripts_counts_only_new_rows() {
    let db = test_db().await;
    db.insert_script(&script("p", "A", "old", 1)).await.unwrap();

    let batch = vec![
        script("p", "A", "new", 2),
        script("p", "B", "b", 2),
        script("p", "B", "b-again", 3),
        script("p", "C", "c", 4),
    ];
    assert_eq!(db.insert_scripts(&batch).await.unwrap(), 2);

    let names: Vec<_> = db
        .list_scripts("p")
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.name, s.content))
        .collect();
    assert_eq!(
        names,
        vec![
            ("A".to_string(), "old".to_string()),
            ("B".to_string(), "b".to_string()),
            ("C".to_string(), "c".to_string()),
        ]
    );
}

#[tokio::test]
async fn list_scripts_recent_orders_by_update() {
    let db = test_db().await;
    db.insert_script(&script("p", "First", "1", 1)).await.unwrap();
    db.insert_script(&script("p", "Second", "2", 2)).await.unwrap();
    db.update_script_content("p", "First", "1b").await.unwrap();

    let recent = db.list_scripts_recent("p").await.unwrap();
    assert_eq!(recent[0].name, "First");
    assert_eq!(recent[1].name, "Second");
}

#[tokio::test]
async fn update_missing_script_is_not_found() {
    let db = test_db().await;
    let err = db.update_script_content("p", "Nope", "x").await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

#[tokio::test]
async fn delete_returns_removed_row() {
    let db = test_db().await;
    let rec = script("p", "Gone", "x", 1);
    db.insert_script(&rec).await.unwrap();

    let removed = db.delete_script("p", "Gone").await.unwrap();
    assert_eq!(removed.id, rec.id);
    assert!(!db.script_exists("p", "Gone").await.unwrap());
    assert!(matches!(
        db.delete_script("p", "Gone").await.unwrap_err(),
        DatabaseError::NotFound(_)
    ));
}

#[tokio::test]
async fn project_stats_counts_kinds_and_backups() {
    let db = test_db().await;
    db.insert_script(&script("p", "A", "x", 10)).await.unwrap();
    let mut luau = script("p", "B", "y", 20);
    luau.script_kind = ScriptKind::Luau;
    db.insert_script(&luau).await.unwrap();
    db.append_snapshot_entry(&entry("p", "p/one.json", 30)).await.unwrap();

    let stats = db.project_stats("p").await.unwrap();
    assert_eq!(stats.total_scripts, 2);
    assert_eq!(stats.lua_scripts, 1);
    assert_eq!(stats.luau_scripts, 1);
    assert_eq!(stats.backup_count, 1);
    assert_eq!(stats.last_updated, Some(20));
    assert_eq!(stats.project_created, Some(10));
}

#[tokio::test]
async fn project_stats_for_empty_project() {
    let db = test_db().await;
    let stats = db.project_stats("empty").await.unwrap();
    assert_eq!(stats.total_scripts, 0);
    assert_eq!(stats.last_updated, None);
}

// === Snapshot index tests ===

#[tokio::test]
async fn latest_snapshot_entry_picks_newest() {
    let db = test_db().await;
    assert!(db.latest_snapshot_entry("p").await.unwrap().is_none());

    db.append_snapshot_entry(&entry("p", "p/old.json", 1)).await.unwrap();
    db.append_snapshot_entry(&entry("p", "p/new.json", 2)).await.unwrap();
    db.append_snapshot_entry(&entry("q", "q/other.json", 3)).await.unwrap();

    let latest = db.latest_snapshot_entry("p").await.unwrap().unwrap();
    assert_eq!(latest.artifact_location, "p/new.json");
    assert_eq!(db.list_snapshot_entries("p").await.unwrap().len(), 2);
}

#[tokio::test]
async fn same_millisecond_entries_use_insertion_order() {
    let db = test_db().await;
    db.append_snapshot_entry(&entry("p", "p/a.json", 5)).await.unwrap();
    db.append_snapshot_entry(&entry("p", "p/b.json", 5)).await.unwrap();
    let latest = db.latest_snapshot_entry("p").await.unwrap().unwrap();
    assert_eq!(latest.artifact_location, "p/b.json");
}

#[tokio::test]
async fn commit_snapshot_is_all_or_nothing() {
    let db = test_db().await;
    // No project row: the count update fails, so the index row must roll back.
    let err = db.commit_snapshot(&entry("ghost", "ghost/x.json", 1)).await;
    assert!(err.is_err());
    assert!(db.latest_snapshot_entry("ghost").await.unwrap().is_none());

    db.ensure_project("real").await.unwrap();
    db.commit_snapshot(&entry("real", "real/x.json", 1)).await.unwrap();
    assert_eq!(db.get_project("real").await.unwrap().unwrap().backup_count, 1);
    assert!(db.latest_snapshot_entry("real").await.unwrap().is_some());
}
