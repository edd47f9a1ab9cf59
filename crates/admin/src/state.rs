use std::sync::Arc;
use std::time::Duration;

use krn_client::api::{ProjectApi, ProjectGateway};
use krn_client::media::{CloudinaryUploader, MediaHost};
use krn_client::session::{CookieJar, SessionStore};
use krn_events::NotificationBus;

use crate::config::AdminConfig;
use crate::error::AppResult;
use crate::store::ProjectStore;

/// Shared application state, built once at start-up and passed to every
/// command and dialog.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AdminConfig>,
    /// Login flag and persisted cookies.
    pub session: Arc<SessionStore>,
    /// Authoritative project collection.
    pub projects: Arc<ProjectStore>,
    /// Upload destination for project images.
    pub media: Arc<dyn MediaHost>,
    /// Toast channel.
    pub notices: Arc<NotificationBus>,
}

impl AppState {
    /// Wire the HTTP collaborators described by `config`.
    pub fn build(config: AdminConfig) -> AppResult<Self> {
        let jar = Arc::new(CookieJar::open(&config.session_file)?);
        let session = Arc::new(SessionStore::load(Arc::clone(&jar)));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(krn_client::api::ApiError::from)?;

        let gateway: Arc<dyn ProjectGateway> = Arc::new(ProjectApi::with_client(
            client.clone(),
            config.api_url.clone(),
            jar,
        ));
        let media: Arc<dyn MediaHost> = Arc::new(CloudinaryUploader::new(
            client,
            &config.media_url,
            &config.cloud_name,
            config.upload_preset.clone(),
        ));

        Ok(Self::with_parts(config, session, gateway, media))
    }

    /// Assemble state from already-built collaborators.
    pub fn with_parts(
        config: AdminConfig,
        session: Arc<SessionStore>,
        gateway: Arc<dyn ProjectGateway>,
        media: Arc<dyn MediaHost>,
    ) -> Self {
        let notices = Arc::new(NotificationBus::default());
        let projects = Arc::new(ProjectStore::new(
            gateway,
            Arc::clone(&session),
            Arc::clone(&notices),
        ));
        Self {
            config: Arc::new(config),
            session,
            projects,
            media,
            notices,
        }
    }
}
