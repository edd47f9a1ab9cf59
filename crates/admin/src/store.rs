//! In-memory project collection synchronised with the REST API.
//!
//! [`ProjectStore`] owns the authoritative ordered list of projects. Each
//! operation issues exactly one gateway request (no retry, no dedup) and
//! applies the result locally only after the server confirms it, so there
//! is never anything to roll back. Concurrent calls settle in completion
//! order. Progress is published on the [`NotificationBus`] and the outcome
//! is returned to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use krn_client::api::{ApiError, ProjectGateway};
use krn_client::session::SessionStore;
use krn_core::gallery::ListView;
use krn_core::project::{Project, ProjectDraft};
use krn_core::types::DbId;
use krn_events::NotificationBus;
use tokio::sync::RwLock;

/// A failed store operation: the user-facing message plus the gateway
/// error behind it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    #[source]
    pub source: ApiError,
}

impl StoreError {
    fn new(message: impl Into<String>, source: ApiError) -> Self {
        Self {
            message: message.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No session; nothing was requested.
    Skipped,
    /// The collection was replaced with this many projects.
    Loaded(usize),
}

/// Raises the loading flag and lowers it on drop, so a load future that is
/// dropped mid-request does not leave the store stuck loading.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ProjectStore {
    gateway: Arc<dyn ProjectGateway>,
    session: Arc<SessionStore>,
    notices: Arc<NotificationBus>,
    projects: RwLock<Vec<Project>>,
    loading: AtomicBool,
}

impl ProjectStore {
    pub fn new(
        gateway: Arc<dyn ProjectGateway>,
        session: Arc<SessionStore>,
        notices: Arc<NotificationBus>,
    ) -> Self {
        Self {
            gateway,
            session,
            notices,
            projects: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
        }
    }

    /// Snapshot of the collection in display order.
    pub async fn projects(&self) -> Vec<Project> {
        self.projects.read().await.clone()
    }

    pub async fn get(&self, id: DbId) -> Option<Project> {
        self.projects.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// What the dashboard grid should show right now.
    pub async fn list_view(&self) -> ListView {
        let projects = self.projects.read().await;
        ListView::build(&projects, self.is_loading())
    }

    /// Replace the collection with the server's list.
    ///
    /// Does nothing without a session. On failure the current collection is
    /// kept as is.
    pub async fn load(&self) -> Result<LoadOutcome, StoreError> {
        if !self.session.is_logged_in() {
            tracing::debug!("Skipping project load: not logged in");
            return Ok(LoadOutcome::Skipped);
        }

        let flag = LoadingFlag::raise(&self.loading);
        let notice = self.notices.loading("Loading projects...");
        let result = self.gateway.list_projects().await;
        drop(flag);

        match result {
            Ok(fetched) => {
                let fetched: Vec<Project> = fetched.into_iter().map(Project::from).collect();
                let count = fetched.len();
                *self.projects.write().await = fetched;
                tracing::info!(count, "Projects loaded");
                notice.success("Projects loaded successfully");
                Ok(LoadOutcome::Loaded(count))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load projects");
                notice.failure("Failed to load projects");
                Err(StoreError::new("Failed to load projects", e))
            }
        }
    }

    /// Create a project and append the server's record.
    pub async fn create(&self, draft: &ProjectDraft) -> Result<Project, StoreError> {
        let notice = self.notices.loading("Creating project...");
        match self.gateway.create_project(draft).await {
            Ok(created) => {
                let project = created.into_project();
                self.projects.write().await.push(project.clone());
                tracing::info!(project_id = project.id, "Project created");
                notice.success("Project created successfully");
                Ok(project)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create project");
                notice.failure("Failed to create project");
                Err(StoreError::new("Failed to create project", e))
            }
        }
    }

    /// Update a project. On success the local record with the same id is
    /// replaced by `project` as submitted.
    pub async fn update(&self, project: Project) -> Result<Project, StoreError> {
        let notice = self.notices.loading("Updating project...");
        match self.gateway.update_project(&project).await {
            Ok(_) => {
                let mut projects = self.projects.write().await;
                for existing in projects.iter_mut().filter(|p| p.id == project.id) {
                    *existing = project.clone();
                }
                drop(projects);
                tracing::info!(project_id = project.id, "Project updated");
                notice.success("Project updated successfully");
                Ok(project)
            }
            Err(e) => {
                let message = e
                    .field_message()
                    .unwrap_or_else(|| "Failed to update project".to_string());
                tracing::warn!(project_id = project.id, error = %e, "Failed to update project");
                notice.failure(message.clone());
                Err(StoreError::new(message, e))
            }
        }
    }

    /// Delete a project by id. An id missing locally still issues the
    /// request; the collection is then left unchanged.
    pub async fn delete(&self, id: DbId) -> Result<(), StoreError> {
        let notice = self.notices.loading("Deleting project...");
        let result = match self.gateway.delete_project(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ApiError::Envelope("Failed to delete project")),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.projects.write().await.retain(|p| p.id != id);
                tracing::info!(project_id = id, "Project deleted");
                notice.success("Project deleted successfully");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(project_id = id, error = %e, "Failed to delete project");
                notice.failure("Failed to delete project");
                Err(StoreError::new("Failed to delete project", e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
