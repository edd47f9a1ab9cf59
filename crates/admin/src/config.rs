use std::path::PathBuf;

use crate::error::AppError;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Project REST API root.
    pub api_url: String,
    /// Media host root (upload path is appended).
    pub media_url: String,
    /// Media host account name.
    pub cloud_name: String,
    /// Unsigned upload preset sent with every image.
    pub upload_preset: String,
    /// Cookie jar file holding `token` and `loggedIn`.
    pub session_file: PathBuf,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl AdminConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                      |
    /// |----------------------------|------------------------------|
    /// | `KRN_API_URL`              | `http://localhost:8080`      |
    /// | `KRN_MEDIA_URL`            | `https://api.cloudinary.com` |
    /// | `KRN_CLOUD_NAME`           | `demo`                       |
    /// | `KRN_UPLOAD_PRESET`        | `unsigned`                   |
    /// | `KRN_SESSION_FILE`         | `.krn-session.json`          |
    /// | `KRN_REQUEST_TIMEOUT_SECS` | `30`                         |
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let request_timeout_secs = var("KRN_REQUEST_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                AppError::Config(format!("KRN_REQUEST_TIMEOUT_SECS must be a valid u64: {e}"))
            })?;

        Ok(Self {
            api_url: var("KRN_API_URL", "http://localhost:8080"),
            media_url: var("KRN_MEDIA_URL", "https://api.cloudinary.com"),
            cloud_name: var("KRN_CLOUD_NAME", "demo"),
            upload_preset: var("KRN_UPLOAD_PRESET", "unsigned"),
            session_file: PathBuf::from(var("KRN_SESSION_FILE", ".krn-session.json")),
            request_timeout_secs,
        })
    }
}
