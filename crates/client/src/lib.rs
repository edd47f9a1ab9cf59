//! HTTP collaborators of the KRN admin client.
//!
//! Provides the REST gateway for the project API, the media-host uploader
//! used by the project form, and the persisted cookie jar that carries the
//! session marker and API credential between runs.

pub mod api;
pub mod media;
pub mod session;
