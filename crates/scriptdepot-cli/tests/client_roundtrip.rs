use serde_json::json;
use tempfile::TempDir;

use scriptdepot_auth::{AuthConfig, Verifier};
use scriptdepot_cli::DepotClient;
use scriptdepot_server::model::ScriptKind;
use scriptdepot_server::service::{
    CreateScriptRequest, DeleteScriptRequest, ProjectRequest, RestoreProjectRequest,
    UpdateScriptRequest, ValidateScriptRequest,
};
use scriptdepot_server::{AppState, DepotDatabase, RouterConfig, ToolService, build_router};

const SECRET: &str = "0123456789abcdef";

/// Serve a fresh depot on an ephemeral port and return its base URL.
async fn spawn_server(sign_reads: bool) -> (String, TempDir) {
    let backups = TempDir::new().unwrap();
    let db = DepotDatabase::open_in_memory().await.unwrap();
    let service = ToolService::new(db, backups.path(), sign_reads);
    let verifier = Verifier::new(AuthConfig::new(SECRET.as_bytes()));
    let app = build_router(AppState::new(service, verifier), &RouterConfig::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), backups)
}

fn create_req(name: &str, content: &str) -> CreateScriptRequest {
    CreateScriptRequest {
        name: name.into(),
        content: content.into(),
        script_type: Some(ScriptKind::Luau),
        project_id: Some("game".into()),
    }
}

#[tokio::test]
async fn health_without_secret() {
    let (url, _dir) = spawn_server(false).await;
    let client = DepotClient::new(&url, None).unwrap();
    let health = client.health().await.unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn unsigned_client_cannot_write() {
    let (url, _dir) = spawn_server(false).await;
    let client = DepotClient::new(&url, None).unwrap();
    let err = client.create_script(&create_req("a", "x = 1")).await.unwrap_err();
    assert_eq!(err.code(), Some("MISSING_SIGNATURE"));
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let (url, _dir) = spawn_server(false).await;
    let client = DepotClient::new(&url, Some("fedcba9876543210")).unwrap();
    let err = client.create_script(&create_req("a", "x = 1")).await.unwrap_err();
    assert_eq!(err.code(), Some("INVALID_SIGNATURE"));
}

#[tokio::test]
async fn script_lifecycle() {
    let (url, _dir) = spawn_server(true).await;
    let client = DepotClient::new(&url, Some(SECRET)).unwrap();

    let created = client.create_script(&create_req("init", "x = 1")).await.unwrap();
    assert_eq!(created.script_type, ScriptKind::Luau);

    let err = client.create_script(&create_req("init", "x = 2")).await.unwrap_err();
    assert_eq!(err.code(), Some("CONFLICT"));

    // Reads are signed over the encoded query.
    let listed = client.list_scripts(Some("game")).await.unwrap();
    assert_eq!(listed.count, 1);
    assert_eq!(listed.scripts[0].id, created.script_id);

    let updated = client
        .update_script(&UpdateScriptRequest {
            name: "init".into(),
            content: "x = 3".into(),
            project_id: Some("game".into()),
        })
        .await
        .unwrap();
    assert_eq!(updated.script_id, created.script_id);

    let status = client.project_status(Some("game")).await.unwrap();
    assert_eq!(status.statistics.total_scripts, 1);
    assert_eq!(status.statistics.luau_scripts, 1);

    client
        .delete_script(&DeleteScriptRequest {
            name: "init".into(),
            project_id: Some("game".into()),
        })
        .await
        .unwrap();
    assert_eq!(client.list_scripts(Some("game")).await.unwrap().count, 0);
}

#[tokio::test]
async fn backup_and_restore() {
    let (url, dir) = spawn_server(false).await;
    let client = DepotClient::new(&url, Some(SECRET)).unwrap();

    client.create_script(&create_req("a", "x = 1")).await.unwrap();
    client.create_script(&create_req("b", "y = 2")).await.unwrap();

    let backup = client
        .backup_project(&ProjectRequest {
            project_id: Some("game".into()),
        })
        .await
        .unwrap();
    assert_eq!(backup.scripts_backed_up, 2);
    assert!(dir.path().join(&backup.backup_path).is_file());

    client
        .delete_script(&DeleteScriptRequest {
            name: "a".into(),
            project_id: Some("game".into()),
        })
        .await
        .unwrap();

    let restored = client
        .restore_project(&RestoreProjectRequest {
            project_id: Some("game".into()),
            backup_path: Some(backup.backup_path.clone()),
        })
        .await
        .unwrap();
    assert_eq!(restored.scripts_restored, 1);
    assert_eq!(restored.scripts_skipped, 1);
    assert_eq!(restored.total_scripts_in_backup, 2);
}

#[tokio::test]
async fn validate_and_mcp_call() {
    let (url, _dir) = spawn_server(false).await;
    let client = DepotClient::new(&url, Some(SECRET)).unwrap();

    let report = client
        .validate_script(&ValidateScriptRequest {
            content: Some("while true do end".into()),
            script_type: None,
        })
        .await
        .unwrap();
    assert!(report.report.valid);
    assert_eq!(report.report.warnings.len(), 1);

    let out = client
        .call_function("create_script", json!({ "name": "m", "content": "print(1)" }))
        .await
        .unwrap();
    assert_eq!(out["project_id"], "default");

    let err = client.call_function("nope", json!({})).await.unwrap_err();
    assert_eq!(err.code(), Some("INVALID_REQUEST"));
}
