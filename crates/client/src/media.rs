//! Image uploads to the external media host.
//!
//! Uploads go to a Cloudinary-style endpoint,
//! `POST {media_url}/v1_1/{cloud_name}/image/upload`, as a multipart form
//! with a `file` part and the configured `upload_preset`. The host answers
//! with the stored image's `secure_url`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use krn_core::form_wizard::ImagePreview;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::sync::watch;

/// Size of each streamed chunk; progress is reported once per chunk.
const CHUNK_SIZE: usize = 16 * 1024;

/// Errors from the media upload layer.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The HTTP request itself failed.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The media host returned a non-2xx status code.
    #[error("Media host error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The response had no usable `secure_url`.
    #[error("Malformed upload response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Shared upload percentage (0-100).
///
/// Concurrent uploads all report into the same value, so it reflects
/// whichever transfer advanced last.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    tx: Arc<watch::Sender<u8>>,
}

impl UploadProgress {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> u8 {
        *self.tx.borrow()
    }

    /// Record `loaded` of `total` bytes sent. Ignored when `total` is zero.
    pub fn report(&self, loaded: usize, total: usize) {
        if total == 0 {
            return;
        }
        let pct = ((loaded as f64 * 100.0) / total as f64).round().min(100.0) as u8;
        self.tx.send_replace(pct);
    }

    pub fn reset(&self) {
        self.tx.send_replace(0);
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// MediaHost
// ---------------------------------------------------------------------------

/// Destination for image uploads.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload one image and return its hosted URL.
    async fn upload(
        &self,
        image: &ImagePreview,
        progress: &UploadProgress,
    ) -> Result<String, UploadError>;
}

/// HTTP client for the media host's unsigned upload endpoint.
pub struct CloudinaryUploader {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryUploader {
    /// * `media_url`     - Host root, e.g. `https://api.cloudinary.com`.
    /// * `cloud_name`    - Account name in the upload path.
    /// * `upload_preset` - Unsigned preset sent with every upload.
    pub fn new(
        client: reqwest::Client,
        media_url: &str,
        cloud_name: &str,
        upload_preset: impl Into<String>,
    ) -> Self {
        Self {
            client,
            upload_url: format!(
                "{}/v1_1/{}/image/upload",
                media_url.trim_end_matches('/'),
                cloud_name
            ),
            upload_preset: upload_preset.into(),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Build the `file` part. Local files are streamed so progress can be
    /// observed; hosted images are passed by URL for the host to fetch.
    fn file_part(image: &ImagePreview, progress: &UploadProgress) -> Part {
        match image {
            ImagePreview::Local { file_name, bytes } => {
                let len = bytes.len() as u64;
                let body = progress_body(Bytes::from(bytes.clone()), progress.clone());
                Part::stream_with_length(body, len).file_name(file_name.clone())
            }
            ImagePreview::Remote(url) => Part::text(url.clone()),
        }
    }
}

#[async_trait]
impl MediaHost for CloudinaryUploader {
    async fn upload(
        &self,
        image: &ImagePreview,
        progress: &UploadProgress,
    ) -> Result<String, UploadError> {
        let form = Form::new()
            .part("file", Self::file_part(image, progress))
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.bytes().await?;
        let parsed: UploadResponse =
            serde_json::from_slice(&raw).map_err(|e| UploadError::Decode(e.to_string()))?;
        tracing::info!(source = image.label(), url = %parsed.secure_url, "Image uploaded");
        Ok(parsed.secure_url)
    }
}

/// Chunked request body that reports progress as each chunk is pulled.
fn progress_body(data: Bytes, progress: UploadProgress) -> reqwest::Body {
    let total = data.len();
    let chunks: Vec<Bytes> = (0..total)
        .step_by(CHUNK_SIZE)
        .map(|start| data.slice(start..(start + CHUNK_SIZE).min(total)))
        .collect();

    let mut sent = 0usize;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        progress.report(sent, total);
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
