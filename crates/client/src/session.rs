//! Persisted cookie jar and the login flag derived from it.
//!
//! The jar is a small JSON object of `name -> value` pairs on disk. Two
//! entries matter: `token` (sent verbatim as the `Authorization` header) and
//! `loggedIn` (presence means a session was established).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Cookie holding the API credential.
pub const TOKEN_COOKIE: &str = "token";

/// Cookie marking an established session.
pub const LOGGED_IN_COOKIE: &str = "loggedIn";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Cookie jar I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cookie jar is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// CookieJar
// ---------------------------------------------------------------------------

/// Name/value store persisted as JSON. Every mutation is written through.
#[derive(Debug)]
pub struct CookieJar {
    path: Option<PathBuf>,
    cookies: RwLock<BTreeMap<String, String>>,
}

impl CookieJar {
    /// Open the jar at `path`. A missing file is an empty jar.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let cookies = match std::fs::read(&path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), count = cookies.len(), "Opened cookie jar");
        Ok(Self {
            path: Some(path),
            cookies: RwLock::new(cookies),
        })
    }

    /// A jar that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cookies: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.read().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: impl Into<String>) -> Result<(), SessionError> {
        let snapshot = {
            let mut cookies = self.write();
            cookies.insert(name.to_string(), value.into());
            cookies.clone()
        };
        self.persist(&snapshot)
    }

    pub fn remove(&self, name: &str) -> Result<(), SessionError> {
        let snapshot = {
            let mut cookies = self.write();
            if cookies.remove(name).is_none() {
                return Ok(());
            }
            cookies.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, cookies: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(cookies)?;
        std::fs::write(path, raw).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.cookies.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.cookies.write().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Cached login flag, seeded from the `loggedIn` cookie at start-up.
#[derive(Debug)]
pub struct SessionStore {
    jar: Arc<CookieJar>,
    logged_in: AtomicBool,
}

impl SessionStore {
    pub fn load(jar: Arc<CookieJar>) -> Self {
        let logged_in = jar.get(LOGGED_IN_COOKIE).is_some();
        tracing::debug!(logged_in, "Session restored");
        Self {
            jar,
            logged_in: AtomicBool::new(logged_in),
        }
    }

    pub fn jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    /// Set the flag. Logging out also drops the persisted `loggedIn` marker;
    /// logging in leaves cookies alone.
    pub fn set_logged_in(&self, logged_in: bool) -> Result<(), SessionError> {
        if !logged_in {
            self.jar.remove(LOGGED_IN_COOKIE)?;
        }
        self.logged_in.store(logged_in, Ordering::SeqCst);
        tracing::info!(logged_in, "Session flag updated");
        Ok(())
    }

    /// Record a credential obtained elsewhere and mark the session active.
    pub fn login(&self, token: &str) -> Result<(), SessionError> {
        self.jar.set(TOKEN_COOKIE, token)?;
        self.jar.set(LOGGED_IN_COOKIE, "true")?;
        self.set_logged_in(true)
    }

    pub fn token(&self) -> Option<String> {
        self.jar.get(TOKEN_COOKIE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(jar.get(TOKEN_COOKIE), None);
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let jar = CookieJar::open(&path).unwrap();
        jar.set(TOKEN_COOKIE, "abc").unwrap();
        drop(jar);

        let reopened = CookieJar::open(&path).unwrap();
        assert_eq!(reopened.get(TOKEN_COOKIE).as_deref(), Some("abc"));
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(CookieJar::open(&path), Err(SessionError::Json(_))));
    }

    #[test]
    fn session_starts_logged_in_when_marker_present() {
        let jar = Arc::new(CookieJar::in_memory());
        jar.set(LOGGED_IN_COOKIE, "true").unwrap();
        assert!(SessionStore::load(jar).is_logged_in());
    }

    #[test]
    fn session_starts_logged_out_without_marker() {
        let jar = Arc::new(CookieJar::in_memory());
        jar.set(TOKEN_COOKIE, "abc").unwrap();
        assert!(!SessionStore::load(jar).is_logged_in());
    }

    #[test]
    fn logout_clears_marker_but_keeps_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let jar = Arc::new(CookieJar::open(&path).unwrap());
        let session = SessionStore::load(Arc::clone(&jar));

        session.login("secret").unwrap();
        assert!(session.is_logged_in());

        session.set_logged_in(false).unwrap();
        assert!(!session.is_logged_in());

        let reopened = CookieJar::open(&path).unwrap();
        assert_eq!(reopened.get(LOGGED_IN_COOKIE), None);
        assert_eq!(reopened.get(TOKEN_COOKIE).as_deref(), Some("secret"));
    }

    #[test]
    fn set_logged_in_true_does_not_write_marker() {
        let jar = Arc::new(CookieJar::in_memory());
        let session = SessionStore::load(Arc::clone(&jar));
        session.set_logged_in(true).unwrap();
        assert!(session.is_logged_in());
        assert_eq!(jar.get(LOGGED_IN_COOKIE), None);
    }
}
