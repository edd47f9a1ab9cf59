//! The add/edit project dialog.
//!
//! Drives a [`ProjectForm`] through its four steps, runs the image upload
//! batch against the media host, and hands the finished record to the
//! project store.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use krn_client::media::{MediaHost, UploadError, UploadProgress};
use krn_core::error::CoreError;
use krn_core::form_wizard::{FormStep, ImagePreview, ProjectForm, Submission};
use krn_core::project::{ImageSlot, Project};
use krn_events::NotificationBus;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::ProjectStore;

const UPLOAD_FAILED: &str = "Failed to upload the images, try again later";
const UPLOAD_DONE: &str = "Images uploaded successfully";

/// Per-slot outcome of one upload batch.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<(ImageSlot, String)>,
    pub failed: Vec<(ImageSlot, UploadError)>,
}

impl UploadReport {
    /// `true` when every attempted slot produced a URL.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Returns the form to idle and zeroes progress when an upload batch ends,
/// whether it settled or its future was dropped.
struct UploadGuard<'a> {
    form: &'a mut ProjectForm,
    progress: &'a UploadProgress,
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        if self.form.is_uploading() {
            tracing::warn!("Upload batch abandoned");
            self.form.cancel_upload();
        }
        self.progress.reset();
    }
}

pub struct ProjectDialog {
    form: ProjectForm,
    store: Arc<ProjectStore>,
    media: Arc<dyn MediaHost>,
    notices: Arc<NotificationBus>,
    progress: UploadProgress,
    open: bool,
}

impl ProjectDialog {
    /// Open an empty dialog for a new project.
    pub fn open_create(state: &AppState) -> Self {
        Self::open_with(state, ProjectForm::create())
    }

    /// Open a dialog pre-filled from `project`.
    pub fn open_edit(state: &AppState, project: &Project) -> Self {
        Self::open_with(state, ProjectForm::edit(project))
    }

    fn open_with(state: &AppState, form: ProjectForm) -> Self {
        Self {
            form,
            store: Arc::clone(&state.projects),
            media: Arc::clone(&state.media),
            notices: Arc::clone(&state.notices),
            progress: UploadProgress::new(),
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn form(&self) -> &ProjectForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProjectForm {
        &mut self.form
    }

    pub fn progress(&self) -> &UploadProgress {
        &self.progress
    }

    pub fn next(&mut self) -> Result<FormStep, CoreError> {
        self.form.next()
    }

    pub fn back(&mut self) -> Result<FormStep, CoreError> {
        self.form.back()
    }

    /// Load a file from disk as the local preview for `slot`.
    pub async fn select_file(&mut self, slot: ImageSlot, path: &Path) -> AppResult<()> {
        let bytes = tokio::fs::read(path).await.map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| slot.field_name());
        tracing::debug!(%slot, file = %file_name, size = bytes.len(), "Image selected");
        self.form
            .select_image(slot, ImagePreview::Local { file_name, bytes });
        Ok(())
    }

    pub fn remove_image(&mut self, slot: ImageSlot) {
        self.form.remove_image(slot);
    }

    /// Upload every slot that has a preview, concurrently, and wait for all
    /// of them to settle.
    ///
    /// Each failed slot gets its own error notice; the batch as a whole is
    /// still announced as uploaded and the form's image fields are
    /// overwritten with whatever URLs did arrive. The returned report keeps
    /// the per-slot failures.
    pub async fn upload_images(&mut self) -> AppResult<UploadReport> {
        let batch = self.form.begin_upload()?;
        self.progress.reset();
        tracing::info!(count = batch.len(), "Uploading images");

        let guard = UploadGuard {
            form: &mut self.form,
            progress: &self.progress,
        };
        let media = &self.media;
        let progress = &self.progress;
        let results = join_all(batch.iter().map(|(slot, preview)| async move {
            (*slot, media.upload(preview, progress).await)
        }))
        .await;

        let mut report = UploadReport::default();
        for (slot, result) in results {
            match result {
                Ok(url) => report.uploaded.push((slot, url)),
                Err(e) => {
                    tracing::warn!(%slot, error = %e, "Image upload failed");
                    self.notices.error(UPLOAD_FAILED);
                    report.failed.push((slot, e));
                }
            }
        }

        self.notices.success(UPLOAD_DONE);
        guard.form.finish_upload(report.uploaded.iter().cloned());
        drop(guard);
        Ok(report)
    }

    /// Validate and send the draft to the store. The dialog closes on
    /// success and stays open, unchanged, on failure.
    pub async fn submit(&mut self) -> AppResult<Project> {
        let project = match self.form.submission()? {
            Submission::Create(draft) => self.store.create(&draft).await?,
            Submission::Update(project) => self.store.update(project).await?,
        };
        self.close();
        Ok(project)
    }

    /// Close the dialog, discarding the draft, previews and progress.
    pub fn close(&mut self) {
        self.form.reset();
        self.progress.reset();
        self.open = false;
    }
}
