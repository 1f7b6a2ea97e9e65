//! Error rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::DepotError;

/// JSON body of every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.to_string(),
        }
    }
}

pub(super) const fn status_for(err: &DepotError) -> StatusCode {
    match err {
        DepotError::Auth(_) => StatusCode::UNAUTHORIZED,
        DepotError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DepotError::NotFound(_) | DepotError::NoBackupFound(_) | DepotError::BackupFileMissing(_) => {
            StatusCode::NOT_FOUND
        }
        DepotError::Conflict(_) => StatusCode::CONFLICT,
        DepotError::InvalidArtifact(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DepotError::Io(_) | DepotError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DepotError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if self.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        }
        (status, Json(ErrorBody::new(self.to_string(), self.code()))).into_response()
    }
}
