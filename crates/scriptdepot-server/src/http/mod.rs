//! axum transport for the tool service.
//!
//! Handlers verify the signature over the raw request bytes first and only
//! then parse JSON from those same bytes.

mod auth;
mod handlers;
mod mcp;
mod response;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use scriptdepot_auth::Verifier;
use scriptdepot_core::config::{Environment, ServerSettings};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use auth::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use mcp::FunctionCall;
pub use response::ErrorBody;

use crate::service::ToolService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: ToolService,
    pub verifier: Arc<Verifier>,
    pub started_at: Instant,
    pub database_path: Option<PathBuf>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(service: ToolService, verifier: Verifier) -> Self {
        Self {
            service,
            verifier: Arc::new(verifier),
            started_at: Instant::now(),
            database_path: None,
            environment: Environment::default(),
        }
    }

    #[must_use]
    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = Some(path);
        self
    }

    #[must_use]
    pub const fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// Transport limits applied as tower layers.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    /// `*` for any origin.
    pub cors_origin: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for RouterConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            max_body_bytes: settings.max_body_bytes,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            cors_origin: settings.cors_origin.clone(),
        }
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return base.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => base.allow_origin(value),
        Err(_) => {
            warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            base
        }
    }
}

/// Build the full router with all routes and layers.
pub fn build_router(state: AppState, config: &RouterConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/performance", get(handlers::performance))
        .route("/api/create_script", post(handlers::create_script))
        .route("/api/list_scripts", get(handlers::list_scripts))
        .route("/api/update_script", put(handlers::update_script))
        .route("/api/delete_script", delete(handlers::delete_script))
        .route("/api/get_project_status", get(handlers::get_project_status))
        .route("/api/validate_script", post(handlers::validate_script))
        .route("/api/backup_project", post(handlers::backup_project))
        .route("/api/restore_project", post(handlers::restore_project))
        .route("/mcp/function", post(mcp::call_function))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors_layer(&config.cors_origin))
        .layer(TraceLayer::new_for_http())
}
