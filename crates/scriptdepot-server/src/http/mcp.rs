//! `POST /mcp/function`: call any tool by name.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::AppState;
use super::auth::authorize_write;
use crate::error::DepotError;
use crate::service::{Tool, ToolOutput};

/// Body of an `/mcp/function` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub function: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Always requires a fresh signature, whatever the tool.
pub(super) async fn call_function(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ToolOutput>, DepotError> {
    let proof = authorize_write(&state, "mcp_function", &headers, &body)?;

    let call: FunctionCall = serde_json::from_slice(&body)
        .map_err(|e| DepotError::InvalidRequest(format!("Invalid JSON body: {e}")))?;
    let tool = Tool::from_name(&call.function).ok_or_else(|| {
        DepotError::InvalidRequest(format!("Unknown function: {}", call.function))
    })?;

    debug!(function = tool.name(), "MCP function call");
    Ok(Json(state.service.dispatch(&proof, tool, call.parameters).await?))
}
