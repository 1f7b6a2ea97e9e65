//! Signature header extraction.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use scriptdepot_auth::{Access, AuthError, Fresh, Verified};
use tracing::warn;

use super::AppState;
use crate::error::DepotError;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `x-signature`, falling back to `Authorization: Bearer <hex>`.
fn signature(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, SIGNATURE_HEADER).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    })
}

fn rejected(operation: &str, e: AuthError) -> DepotError {
    warn!(operation, code = e.code(), "Rejected request");
    DepotError::Auth(e)
}

/// Check `payload` against `access` and mint a proof.
pub(super) fn authorize(
    state: &AppState,
    access: Access,
    operation: &str,
    headers: &HeaderMap,
    payload: &[u8],
) -> Result<Verified, DepotError> {
    state
        .verifier
        .authorize(
            access,
            payload,
            header_str(headers, TIMESTAMP_HEADER),
            signature(headers),
        )
        .map_err(|e| rejected(operation, e))
}

/// Require a signed, in-window request and mint a write proof.
pub(super) fn authorize_write(
    state: &AppState,
    operation: &str,
    headers: &HeaderMap,
    payload: &[u8],
) -> Result<Fresh, DepotError> {
    state
        .verifier
        .authorize_fresh(
            payload,
            header_str(headers, TIMESTAMP_HEADER),
            signature(headers),
        )
        .map_err(|e| rejected(operation, e))
}
