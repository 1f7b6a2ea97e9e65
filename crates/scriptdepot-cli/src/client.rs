//! Signing HTTP client for the depot API.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use scriptdepot_auth::Signer;
use scriptdepot_server::http::{ErrorBody, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use scriptdepot_server::service::{
    BackupProjectResponse, CreateScriptRequest, CreateScriptResponse, DeleteScriptRequest,
    DeleteScriptResponse, ListScriptsResponse, ProjectRequest, ProjectStatusResponse,
    RestoreProjectRequest, RestoreProjectResponse, UpdateScriptRequest, UpdateScriptResponse,
    ValidateScriptRequest, ValidateScriptResponse,
};

/// Depot client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Depot API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// The server's error code, if the server answered with one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DepotClient {
    http: reqwest::Client,
    base_url: Url,
    signer: Option<Signer>,
}

impl DepotClient {
    /// Create a client for the server at `base_url`. Without a secret,
    /// requests go out unsigned and only open endpoints will succeed.
    pub fn new(base_url: &str, secret: Option<&str>) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("Invalid server URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "Server URL cannot carry paths: {base_url}"
            )));
        }

        // reqwest is built with rustls-no-provider; Err means a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url,
            signer: secret.map(|s| Signer::new(s.as_bytes())),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("Invalid path {path}: {e}")))
    }

    /// Attach timestamp and signature headers covering `payload`.
    fn sign(&self, req: RequestBuilder, payload: &[u8]) -> RequestBuilder {
        match &self.signer {
            Some(signer) => {
                let (ts, signature) = signer.sign_now(payload);
                req.header(TIMESTAMP_HEADER, ts.to_string())
                    .header(SIGNATURE_HEADER, signature)
            }
            None => req,
        }
    }

    async fn decode<R: DeserializeOwned>(resp: Response) -> Result<R, ClientError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }
        let (code, message) = match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => (body.code, body.error),
            Err(_) => (
                "HTTP_ERROR".to_string(),
                status.canonical_reason().unwrap_or("Unknown").to_string(),
            ),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Serialize `body` once, sign those bytes and send them unchanged.
    async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        let bytes = serde_json::to_vec(body)?;
        debug!(%method, path, len = bytes.len(), "Sending request");
        let req = self
            .http
            .request(method, self.url(path)?)
            .header(CONTENT_TYPE, "application/json");
        let resp = self.sign(req, &bytes).body(bytes).send().await?;
        Self::decode(resp).await
    }

    /// GET with `params` in the query string; the signature covers the encoded query.
    async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        let mut url = self.url(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let query = url.query().unwrap_or_default().to_string();
        debug!(path, query = %query, "Sending request");
        let req = self.http.get(url);
        let resp = self.sign(req, query.as_bytes()).send().await?;
        Self::decode(resp).await
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        let resp = self.http.get(self.url("/health")?).send().await?;
        Self::decode(resp).await
    }

    pub async fn create_script(
        &self,
        req: &CreateScriptRequest,
    ) -> Result<CreateScriptResponse, ClientError> {
        self.send_json(Method::POST, "/api/create_script", req).await
    }

    pub async fn list_scripts(
        &self,
        project_id: Option<&str>,
    ) -> Result<ListScriptsResponse, ClientError> {
        let params: Vec<(&str, &str)> = project_id.map(|p| ("project_id", p)).into_iter().collect();
        self.get("/api/list_scripts", &params).await
    }

    pub async fn update_script(
        &self,
        req: &UpdateScriptRequest,
    ) -> Result<UpdateScriptResponse, ClientError> {
        self.send_json(Method::PUT, "/api/update_script", req).await
    }

    pub async fn delete_script(
        &self,
        req: &DeleteScriptRequest,
    ) -> Result<DeleteScriptResponse, ClientError> {
        self.send_json(Method::DELETE, "/api/delete_script", req).await
    }

    pub async fn project_status(
        &self,
        project_id: Option<&str>,
    ) -> Result<ProjectStatusResponse, ClientError> {
        let params: Vec<(&str, &str)> = project_id.map(|p| ("project_id", p)).into_iter().collect();
        self.get("/api/get_project_status", &params).await
    }

    pub async fn validate_script(
        &self,
        req: &ValidateScriptRequest,
    ) -> Result<ValidateScriptResponse, ClientError> {
        self.send_json(Method::POST, "/api/validate_script", req).await
    }

    pub async fn backup_project(
        &self,
        req: &ProjectRequest,
    ) -> Result<BackupProjectResponse, ClientError> {
        self.send_json(Method::POST, "/api/backup_project", req).await
    }

    pub async fn restore_project(
        &self,
        req: &RestoreProjectRequest,
    ) -> Result<RestoreProjectResponse, ClientError> {
        self.send_json(Method::POST, "/api/restore_project", req).await
    }

    /// Call a tool by name through `/mcp/function`.
    pub async fn call_function(
        &self,
        function: &str,
        parameters: Value,
    ) -> Result<Value, ClientError> {
        let body = scriptdepot_server::http::FunctionCall {
            function: function.to_string(),
            parameters,
        };
        self.send_json(Method::POST, "/mcp/function", &body).await
    }
}
