//! REST route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

use super::AppState;
use super::auth::{authorize, authorize_write};
use super::response::ErrorBody;
use crate::error::DepotError;
use crate::service::{
    BackupProjectResponse, CreateScriptResponse, DeleteScriptResponse, ListScriptsResponse,
    ProjectRequest, ProjectStatusResponse, RestoreProjectResponse, Tool, UpdateScriptResponse,
    ValidateScriptResponse,
};

type ApiResult<T> = Result<Json<T>, DepotError>;

/// Parse a JSON body; an empty body means "all defaults".
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, DepotError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| DepotError::InvalidRequest(format!("Invalid JSON body: {e}")))
}

fn parse_query<T: DeserializeOwned>(uri: &Uri) -> Result<T, DepotError> {
    Query::<T>::try_from_uri(uri)
        .map(|Query(q)| q)
        .map_err(|e| DepotError::InvalidRequest(format!("Invalid query string: {e}")))
}

/// The signed payload of a body-less request is its raw query string.
fn query_payload(uri: &Uri) -> &[u8] {
    uri.query().unwrap_or_default().as_bytes()
}

fn guard(
    state: &AppState,
    tool: Tool,
    headers: &HeaderMap,
    payload: &[u8],
) -> Result<scriptdepot_auth::Verified, DepotError> {
    authorize(state, state.service.access(tool), tool.name(), headers, payload)
}

fn guard_write(
    state: &AppState,
    tool: Tool,
    headers: &HeaderMap,
    payload: &[u8],
) -> Result<scriptdepot_auth::Fresh, DepotError> {
    authorize_write(state, tool.name(), headers, payload)
}

/// `GET /health`
pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query("SELECT 1")
        .execute(state.service.database().pool())
        .await
    {
        Ok(_) => "connected",
        Err(e) => {
            warn!(error = %e, "Health check database query failed");
            "disconnected"
        }
    };
    let status = if database == "connected" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
            "timestamp": scriptdepot_core::db::unix_timestamp_millis(),
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "database": { "status": database },
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// `GET /api/performance`
pub(super) async fn performance(State(state): State<AppState>) -> Json<Value> {
    let db_size = match &state.database_path {
        Some(path) => tokio::fs::metadata(path).await.ok().map(|m| m.len()),
        None => None,
    };
    Json(json!({
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "timestamp": scriptdepot_core::db::unix_timestamp_millis(),
        "database": {
            "path": state.database_path.as_ref().map(|p| p.display().to_string()),
            "size_bytes": db_size,
        },
        "server": {
            "environment": state.environment.as_str(),
            "version": env!("CARGO_PKG_VERSION"),
        },
    }))
}

/// `POST /api/create_script`
pub(super) async fn create_script(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<CreateScriptResponse> {
    let proof = guard_write(&state, Tool::CreateScript, &headers, &body)?;
    let req = parse_body(&body)?;
    Ok(Json(state.service.create_script(&proof, req).await?))
}

/// `GET /api/list_scripts?project_id=...`
pub(super) async fn list_scripts(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> ApiResult<ListScriptsResponse> {
    let proof = guard(&state, Tool::ListScripts, &headers, query_payload(&uri))?;
    let req: ProjectRequest = parse_query(&uri)?;
    Ok(Json(state.service.list_scripts(&proof, req).await?))
}

/// `PUT /api/update_script`
pub(super) async fn update_script(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UpdateScriptResponse> {
    let proof = guard_write(&state, Tool::UpdateScript, &headers, &body)?;
    let req = parse_body(&body)?;
    Ok(Json(state.service.update_script(&proof, req).await?))
}

/// `DELETE /api/delete_script`
pub(super) async fn delete_script(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<DeleteScriptResponse> {
    let proof = guard_write(&state, Tool::DeleteScript, &headers, &body)?;
    let req = parse_body(&body)?;
    Ok(Json(state.service.delete_script(&proof, req).await?))
}

/// `GET /api/get_project_status?project_id=...`
pub(super) async fn get_project_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> ApiResult<ProjectStatusResponse> {
    let proof = guard(&state, Tool::GetProjectStatus, &headers, query_payload(&uri))?;
    let req: ProjectRequest = parse_query(&uri)?;
    Ok(Json(state.service.get_project_status(&proof, req).await?))
}

/// `POST /api/validate_script`
pub(super) async fn validate_script(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ValidateScriptResponse> {
    let proof = guard(&state, Tool::ValidateScript, &headers, &body)?;
    let req = parse_body(&body)?;
    Ok(Json(state.service.validate_script(&proof, req)?))
}

/// `POST /api/backup_project`
pub(super) async fn backup_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<BackupProjectResponse> {
    let proof = guard_write(&state, Tool::BackupProject, &headers, &body)?;
    let req = parse_body(&body)?;
    Ok(Json(state.service.backup_project(&proof, req).await?))
}

/// `POST /api/restore_project`
pub(super) async fn restore_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<RestoreProjectResponse> {
    let proof = guard_write(&state, Tool::RestoreProject, &headers, &body)?;
    let req = parse_body(&body)?;
    Ok(Json(state.service.restore_project(&proof, req).await?))
}

/// Fallback for unknown paths.
pub(super) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("API endpoint not found", "NOT_FOUND")),
    )
}
