//! Persistence of session tokens between runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::AuthTokens;

/// Errors reading or writing stored sessions.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed session data: {0}")]
    Format(#[from] serde_json::Error),
}

/// Where tokens live between runs.
///
/// Only tokens and the location a login redirect interrupted are stored.
/// The user record is always re-fetched from the API on startup, so a stale
/// role or certification flag never outlives the server's view of it.
pub trait SessionStore: Send + Sync {
    /// Stored tokens, or `None` if there is no session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the store cannot be read or holds
    /// malformed data.
    fn load(&self) -> Result<Option<AuthTokens>, SessionStoreError>;

    /// Replace the stored tokens.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the store cannot be written.
    fn save(&self, tokens: &AuthTokens) -> Result<(), SessionStoreError>;

    /// Forget the stored tokens. Clearing an empty store succeeds. A
    /// pending return location is kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the store cannot be written.
    fn clear(&self) -> Result<(), SessionStoreError>;

    /// The location to open after the next login, if one is pending.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the store cannot be read.
    fn load_return_to(&self) -> Result<Option<String>, SessionStoreError>;

    /// Set or forget the location to open after the next login.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the store cannot be written.
    fn save_return_to(&self, location: Option<&str>) -> Result<(), SessionStoreError>;
}

/// On-disk shape of a session. A file may hold only a return location,
/// written while logged out.
#[derive(Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    return_to: Option<String>,
}

impl SessionFile {
    fn tokens(&self) -> Option<AuthTokens> {
        let access = self.access_token.clone()?;
        Some(AuthTokens {
            access: SecretString::from(access),
            refresh: self.refresh_token.clone().map(SecretString::from),
        })
    }

    fn set_tokens(&mut self, tokens: Option<&AuthTokens>) {
        self.access_token = tokens.map(|t| t.access.expose_secret().to_string());
        self.refresh_token = tokens
            .and_then(|t| t.refresh.as_ref())
            .map(|token| token.expose_secret().to_string());
    }

    const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.return_to.is_none()
    }
}

/// Session kept in process memory. Used by tests and one-shot runs.
#[derive(Default)]
pub struct MemorySessionStore {
    tokens: Mutex<Option<AuthTokens>>,
    return_to: Mutex<Option<String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `tokens`.
    #[must_use]
    pub fn with_tokens(tokens: AuthTokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
            return_to: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occupied = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("MemorySessionStore")
            .field("occupied", &occupied)
            .finish()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<AuthTokens>, SessionStoreError> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), SessionStoreError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn load_return_to(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(self
            .return_to
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_return_to(&self, location: Option<&str>) -> Result<(), SessionStoreError> {
        *self.return_to.lock().unwrap_or_else(PoisonError::into_inner) =
            location.map(str::to_string);
        Ok(())
    }
}

/// Session kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileSessionStore {
    /// The file contents, or an empty session if there is no file.
    fn read(&self) -> Result<SessionFile, SessionStoreError> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SessionFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`read`](Self::read), but an unreadable file counts as empty so
    /// that it is overwritten.
    fn read_for_update(&self) -> SessionFile {
        self.read().unwrap_or_else(|e| {
            tracing::debug!(path = %self.path.display(), error = %e, "Replacing unreadable session file");
            SessionFile::default()
        })
    }

    /// Write `file`, or remove the file once it holds nothing.
    fn write(&self, file: &SessionFile) -> Result<(), SessionStoreError> {
        if file.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => {
                    tracing::debug!(path = %self.path.display(), "Session cleared");
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(file)?;

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<AuthTokens>, SessionStoreError> {
        Ok(self.read()?.tokens())
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), SessionStoreError> {
        let mut file = self.read_for_update();
        file.set_tokens(Some(tokens));
        self.write(&file)
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        let mut file = self.read_for_update();
        file.set_tokens(None);
        self.write(&file)
    }

    fn load_return_to(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(self.read()?.return_to)
    }

    fn save_return_to(&self, location: Option<&str>) -> Result<(), SessionStoreError> {
        let mut file = self.read_for_update();
        file.return_to = location.map(str::to_string);
        self.write(&file)
    }
}

/// Tokens are readable by the owner only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
