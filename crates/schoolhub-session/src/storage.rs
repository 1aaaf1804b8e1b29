//! Durable token storage backends.
//!
//! A backend stores at most one token. "No token" is a normal answer
//! (`Ok(None)`), distinct from "the storage could not be read"
//! ([`SessionError::StorageUnavailable`]).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use directories::ProjectDirs;
use schoolhub_protocol::SessionToken;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Where the session token is kept between runs.
///
/// Implementations use interior mutability so a single backend can be
/// shared behind an `Arc` by every flow of the client.
pub trait TokenStorage: Send + Sync + 'static {
    /// Reads the stored token, `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<SessionToken>, SessionError>;

    /// Replaces any stored token.
    fn store(&self, token: &SessionToken) -> Result<(), SessionError>;

    /// Removes the stored token. Removing an absent token is not an error.
    fn remove(&self) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// File name under the platform data directory.
const TOKEN_FILE: &str = "session.json";

/// On-disk layout: a single-key JSON object.
#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: SessionToken,
}

/// Stores the token as `{"token": "..."}` in a JSON file.
///
/// Writes go through a sibling temp file and a rename, so a crash mid-write
/// leaves either the old token or the new one on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `session.json` in the platform data directory
    /// (`~/.local/share/schoolhub` on Linux).
    ///
    /// # Errors
    /// Returns [`SessionError::StorageUnavailable`] when no home directory
    /// can be determined.
    pub fn default_location() -> Result<Self, SessionError> {
        let dirs = ProjectDirs::from("", "", "schoolhub").ok_or_else(|| {
            SessionError::StorageUnavailable("could not determine a data directory".into())
        })?;
        Ok(Self::new(dirs.data_dir().join(TOKEN_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<SessionToken>, SessionError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::StorageUnavailable(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str::<StoredToken>(&content) {
            Ok(stored) if !stored.token.is_blank() => Ok(Some(stored.token)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring unreadable session file"
                );
                Ok(None)
            }
        }
    }

    fn store(&self, token: &SessionToken) -> Result<(), SessionError> {
        let unavailable = |what: &str, e: std::io::Error| {
            SessionError::StorageUnavailable(format!("failed to {what} {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| unavailable("create directory for", e))?;
        }

        let content = serde_json::to_string(&StoredToken {
            token: token.clone(),
        })
        .map_err(|e| SessionError::StorageUnavailable(format!("failed to encode token: {e}")))?;

        let temp = self.temp_path();
        fs::write(&temp, content).map_err(|e| unavailable("write", e))?;
        fs::rename(&temp, &self.path).map_err(|e| unavailable("replace", e))?;

        tracing::debug!(path = %self.path.display(), "session token stored");
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::StorageUnavailable(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Keeps the token in memory only. Useful for tests and for clients that
/// must not touch the disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<SessionToken>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out holding `token`, as if a previous run had signed in.
    pub fn with_token(token: SessionToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<SessionToken>, SessionError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store(&self, token: &SessionToken) -> Result<(), SessionError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
