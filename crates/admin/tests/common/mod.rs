//! Shared helpers for the admin integration tests.
//!
//! [`MockBackend`] serves the project REST routes and the media upload
//! route from one in-process axum server bound to an ephemeral port, keeps
//! projects in memory, and records every request it sees.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::broadcast;

use krn_admin::config::AdminConfig;
use krn_admin::state::AppState;
use krn_events::Notice;

pub const TEST_TOKEN: &str = "secret-token";

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

/// One multipart upload as seen by the mock media route.
#[derive(Debug, Clone, Default)]
pub struct RecordedUpload {
    /// Set when the `file` part carried a file name.
    pub file_name: Option<String>,
    /// Set when the `file` part was plain text (a URL to fetch).
    pub file_url: Option<String>,
    pub file_len: usize,
    pub upload_preset: Option<String>,
}

#[derive(Default)]
struct Inner {
    projects: Vec<Value>,
    next_id: i64,
    requests: Vec<RecordedRequest>,
    uploads: Vec<RecordedUpload>,
    overrides: HashMap<&'static str, (StatusCode, Value)>,
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Inner>>);

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.0.lock().unwrap()
    }

    fn take_override(&self, route: &'static str) -> Option<Response> {
        self.lock()
            .overrides
            .remove(route)
            .map(|(status, body)| (status, Json(body)).into_response())
    }
}

pub struct MockBackend {
    pub base_url: String,
    shared: Shared,
}

impl MockBackend {
    /// Start the mock on `127.0.0.1:0`.
    pub async fn start() -> Self {
        let shared = Shared::default();
        shared.lock().next_id = 1;

        let app = Router::new()
            .route("/projects", get(list_projects))
            .route("/create-project", post(create_project))
            .route("/update-project", put(update_project))
            .route("/delete-project", delete(delete_project))
            .route("/v1_1/{cloud}/image/upload", post(upload_image))
            .layer(middleware::from_fn_with_state(shared.clone(), record))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            shared,
        }
    }

    /// Insert a project record directly, bypassing the API.
    pub fn seed(&self, name: &str, desc: &str, images: &[(u8, &str)]) -> i64 {
        let mut inner = self.shared.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let mut record = json!({ "id": id, "name": name, "desc": desc });
        for n in 1..=9u8 {
            let url = images
                .iter()
                .find(|(slot, _)| *slot == n)
                .map(|(_, url)| *url)
                .unwrap_or("");
            record[format!("image{n}")] = json!(url);
        }
        inner.projects.push(record);
        id
    }

    /// Answer the next call to `route` (`list`, `create`, `update`,
    /// `delete` or `upload`) with a canned response.
    pub fn respond_once(&self, route: &'static str, status: StatusCode, body: Value) {
        self.shared.lock().overrides.insert(route, (status, body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.lock().requests.clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.shared.lock().uploads.clone()
    }

    pub fn stored(&self) -> Vec<Value> {
        self.shared.lock().projects.clone()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn record(State(shared): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    shared.lock().requests.push(recorded);
    next.run(request).await
}

#[derive(Deserialize)]
struct IdQuery {
    id: i64,
}

fn stamped(mut project: Value) -> Value {
    project["createdAt"] = json!("2024-05-01T10:00:00Z");
    project["updatedAt"] = json!("2024-05-02T10:00:00Z");
    project
}

async fn list_projects(State(shared): State<Shared>) -> Response {
    if let Some(canned) = shared.take_override("list") {
        return canned;
    }
    let projects: Vec<Value> = shared.lock().projects.iter().cloned().map(stamped).collect();
    Json(json!({ "success": true, "data": { "projects": projects } })).into_response()
}

async fn create_project(State(shared): State<Shared>, Json(mut body): Json<Value>) -> Response {
    if let Some(canned) = shared.take_override("create") {
        return canned;
    }
    let mut inner = shared.lock();
    let id = inner.next_id;
    inner.next_id += 1;
    body["id"] = json!(id);
    inner.projects.push(body.clone());
    Json(json!({ "success": true, "data": { "createdProject": stamped(body) } })).into_response()
}

async fn update_project(
    State(shared): State<Shared>,
    Query(query): Query<IdQuery>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(canned) = shared.take_override("update") {
        return canned;
    }
    let mut inner = shared.lock();
    let Some(existing) = inner.projects.iter_mut().find(|p| p["id"] == query.id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Project not found" })),
        )
            .into_response();
    };
    *existing = body.clone();
    Json(json!({ "success": true, "data": { "updatedProject": stamped(body) } })).into_response()
}

async fn delete_project(State(shared): State<Shared>, Query(query): Query<IdQuery>) -> Response {
    if let Some(canned) = shared.take_override("delete") {
        return canned;
    }
    shared.lock().projects.retain(|p| p["id"] != query.id);
    Json(json!({ "success": true, "data": {} })).into_response()
}

/// Accepts the `file` and `upload_preset` parts. Files whose name contains
/// `fail` are rejected with a 500.
async fn upload_image(State(shared): State<Shared>, mut multipart: Multipart) -> Response {
    let mut upload = RecordedUpload::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        match (name.as_deref(), file_name) {
            (Some("file"), Some(file_name)) => {
                upload.file_len = field.bytes().await.unwrap().len();
                upload.file_name = Some(file_name);
            }
            (Some("file"), None) => upload.file_url = Some(field.text().await.unwrap()),
            (Some("upload_preset"), _) => {
                upload.upload_preset = Some(field.text().await.unwrap())
            }
            _ => {}
        }
    }

    if let Some(canned) = shared.take_override("upload") {
        return canned;
    }
    let rejected = upload
        .file_name
        .as_deref()
        .is_some_and(|name| name.contains("fail"));

    let mut inner = shared.lock();
    inner.uploads.push(upload);
    if rejected {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "Upload rejected" } })),
        )
            .into_response();
    }
    let n = inner.uploads.len();
    Json(json!({ "secure_url": format!("https://cdn.test/{n}.jpg") })).into_response()
}

// ---------------------------------------------------------------------------
// State helpers
// ---------------------------------------------------------------------------

/// Client configuration pointing both the API and the media host at `mock`.
pub fn test_config(mock: &MockBackend, session_file: PathBuf) -> AdminConfig {
    AdminConfig {
        api_url: mock.base_url.clone(),
        media_url: mock.base_url.clone(),
        cloud_name: "krn".to_string(),
        upload_preset: "unsigned".to_string(),
        session_file,
        request_timeout_secs: 5,
    }
}

/// Build the production [`AppState`] against `mock`, with the session file
/// in a fresh temp dir. Logs in with [`TEST_TOKEN`] when `logged_in`.
///
/// The returned `TempDir` must outlive the state.
pub fn build_test_state(mock: &MockBackend, logged_in: bool) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(mock, dir.path().join("session.json"));
    let state = AppState::build(config).unwrap();
    if logged_in {
        state.session.login(TEST_TOKEN).unwrap();
    }
    (state, dir)
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Drain every notice published so far.
pub fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}
