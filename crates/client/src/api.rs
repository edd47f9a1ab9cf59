//! REST client for the project API.
//!
//! Every endpoint answers with a `{ "success": bool, "data": ... }`
//! envelope. [`ProjectApi`] unwraps it, attaches the session credential to
//! each request, and normalises failures into [`ApiError`].

use std::sync::Arc;

use async_trait::async_trait;
use krn_core::project::{Project, ProjectDraft, ResponseProject};
use krn_core::types::DbId;
use reqwest::header::AUTHORIZATION;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;

use crate::session::{CookieJar, TOKEN_COOKIE};

/// Errors from the project API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered 2xx but with `success: false`.
    #[error("{0}")]
    Envelope(&'static str),

    /// The server answered non-2xx. `body` is the error payload the
    /// operation surfaces: the whole body or its nested `error` member.
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: Value },

    /// A 2xx body that does not match the envelope.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Server-supplied error payload, if any.
    pub fn server_body(&self) -> Option<&Value> {
        match self {
            Self::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Human message from a server error object with exactly one key,
    /// e.g. `{"name": "Name already taken"}`.
    ///
    /// Single-key objects are unwrapped until a string is reached, so a
    /// whole body of `{"error": {"name": "..."}}` yields the same message.
    pub fn field_message(&self) -> Option<String> {
        self.server_body().and_then(single_field_message)
    }
}

fn single_field_message(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    match obj.values().next()? {
        Value::String(msg) => Some(msg.clone()),
        nested @ Value::Object(_) => single_field_message(nested),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// The four project operations the store depends on.
#[async_trait]
pub trait ProjectGateway: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<ResponseProject>, ApiError>;

    async fn create_project(&self, draft: &ProjectDraft) -> Result<ResponseProject, ApiError>;

    async fn update_project(&self, project: &Project) -> Result<ResponseProject, ApiError>;

    /// `Ok(true)` only when the server confirms the deletion.
    async fn delete_project(&self, id: DbId) -> Result<bool, ApiError>;
}

// ---------------------------------------------------------------------------
// Envelope payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ProjectsData {
    projects: Vec<ResponseProject>,
}

#[derive(Debug, Deserialize)]
struct CreatedData {
    #[serde(rename = "createdProject")]
    created_project: ResponseProject,
}

#[derive(Debug, Deserialize)]
struct UpdatedData {
    #[serde(rename = "updatedProject")]
    updated_project: ResponseProject,
}

/// Which part of a non-2xx body an operation reports.
#[derive(Debug, Clone, Copy)]
enum ErrorPayload {
    WholeBody,
    NestedError,
}

// ---------------------------------------------------------------------------
// ProjectApi
// ---------------------------------------------------------------------------

/// HTTP client for the project REST API.
pub struct ProjectApi {
    client: reqwest::Client,
    api_url: String,
    jar: Arc<CookieJar>,
}

impl ProjectApi {
    /// Create a client for the API rooted at `api_url`.
    pub fn new(api_url: impl Into<String>, jar: Arc<CookieJar>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, jar)
    }

    /// Create a client reusing an existing [`reqwest::Client`] (timeouts,
    /// connection pool).
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        jar: Arc<CookieJar>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_url,
            jar,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    // ---- private helpers ----

    /// Attach the credential, send, and map non-2xx responses to
    /// [`ApiError::Server`].
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        payload: ErrorPayload,
    ) -> Result<reqwest::Response, ApiError> {
        let request = match self.jar.get(TOKEN_COOKIE) {
            Some(token) => request.header(AUTHORIZATION, token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        let body = match payload {
            ErrorPayload::WholeBody => body,
            ErrorPayload::NestedError => body.get("error").cloned().unwrap_or(Value::Null),
        };
        tracing::warn!(status = status.as_u16(), %body, "Project API returned an error");
        Err(ApiError::Server {
            status: status.as_u16(),
            body,
        })
    }

    /// Decode the envelope, failing with `failure` when `success` is false.
    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
        failure: &'static str,
    ) -> Result<Option<T>, ApiError> {
        let raw = response.bytes().await?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&raw).map_err(|e| ApiError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ApiError::Envelope(failure));
        }
        Ok(envelope.data)
    }

    fn require<T>(data: Option<T>) -> Result<T, ApiError> {
        data.ok_or_else(|| ApiError::Decode("response has no data".to_string()))
    }
}

#[async_trait]
impl ProjectGateway for ProjectApi {
    /// `GET /projects`
    async fn list_projects(&self) -> Result<Vec<ResponseProject>, ApiError> {
        let response = self
            .send(self.client.get(self.url("/projects")), ErrorPayload::WholeBody)
            .await?;
        let data: ProjectsData =
            Self::require(Self::unwrap_envelope(response, "Failed to fetch projects").await?)?;
        tracing::debug!(count = data.projects.len(), "Fetched projects");
        Ok(data.projects)
    }

    /// `POST /create-project`
    async fn create_project(&self, draft: &ProjectDraft) -> Result<ResponseProject, ApiError> {
        let response = self
            .send(
                self.client.post(self.url("/create-project")).json(draft),
                ErrorPayload::NestedError,
            )
            .await?;
        let data: CreatedData =
            Self::require(Self::unwrap_envelope(response, "Failed to create project").await?)?;
        tracing::debug!(project_id = data.created_project.project.id, "Created project");
        Ok(data.created_project)
    }

    /// `PUT /update-project?id=<id>`
    async fn update_project(&self, project: &Project) -> Result<ResponseProject, ApiError> {
        let response = self
            .send(
                self.client
                    .put(self.url("/update-project"))
                    .query(&[("id", project.id)])
                    .json(project),
                ErrorPayload::WholeBody,
            )
            .await?;
        let data: UpdatedData =
            Self::require(Self::unwrap_envelope(response, "Failed to update project").await?)?;
        tracing::debug!(project_id = project.id, "Updated project");
        Ok(data.updated_project)
    }

    /// `DELETE /delete-project?id=<id>`
    async fn delete_project(&self, id: DbId) -> Result<bool, ApiError> {
        let response = self
            .send(
                self.client
                    .delete(self.url("/delete-project"))
                    .query(&[("id", id)]),
                ErrorPayload::NestedError,
            )
            .await?;
        Self::unwrap_envelope::<IgnoredAny>(response, "Failed to delete project").await?;
        tracing::debug!(project_id = id, "Deleted project");
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
