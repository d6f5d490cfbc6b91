//! Durable server-side session records.
//!
//! Deployments that keep credentials out of cookies store them as
//! per-session JSON records under a directory. A record implements
//! [`CredentialStore`], so the resolver works directly against it and
//! rotated tokens are persisted the moment they are written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use deskbrief_auth::{CredentialStore, SessionCredentials};

/// Directory of per-session credential records.
#[derive(Debug)]
pub struct SessionDir {
    dir: PathBuf,
}

impl SessionDir {
    /// Creates a handle over the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Opens the record for a session, loading any persisted credentials.
    ///
    /// Session ids are restricted to a filename-safe alphabet; anything
    /// else is rejected before touching the filesystem.
    pub fn record(&self, session_id: &str) -> io::Result<SessionRecord> {
        if !is_safe_id(session_id) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid session id",
            ));
        }

        let path = self.dir.join(format!("{}.json", session_id));
        let credentials = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding unreadable session record");
                SessionCredentials::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => SessionCredentials::new(),
            Err(e) => return Err(e),
        };

        Ok(SessionRecord {
            path,
            cached: Mutex::new(credentials),
        })
    }
}

/// Checks that a session id is safe to embed in a filename.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// One session's durable credential record.
#[derive(Debug)]
pub struct SessionRecord {
    path: PathBuf,
    cached: Mutex<SessionCredentials>,
}

impl SessionRecord {
    /// Returns the record's path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the record (logout).
    pub fn clear(&self) -> io::Result<()> {
        *self.cached.lock().unwrap() = SessionCredentials::new();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Persists credentials: temp file then rename, so a concurrent
    /// reader never observes a partial record.
    fn save(&self, credentials: &SessionCredentials) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(credentials)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!(path = %self.path.display(), "saved session record");
        Ok(())
    }
}

impl CredentialStore for SessionRecord {
    fn read(&self) -> SessionCredentials {
        self.cached.lock().unwrap().clone()
    }

    fn write(&self, credentials: SessionCredentials) {
        *self.cached.lock().unwrap() = credentials.clone();
        if let Err(e) = self.save(&credentials) {
            warn!(path = %self.path.display(), error = %e, "failed to persist session record");
        }
    }
}
