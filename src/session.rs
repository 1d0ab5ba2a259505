/// Pending authorization sessions keyed by state nonce
use crate::error::{OAuthError, Result};
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Verifier held between the authorization redirect and the token exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: String,
    pub code_verifier: String,
    pub created_at: u64,
    #[serde(default)]
    pub provider_key: Option<String>,
}

impl Session {
    /// Create a new session
    pub fn new(state: String, code_verifier: String) -> Self {
        Self {
            state,
            code_verifier,
            created_at: unix_now(),
            provider_key: None,
        }
    }

    /// Create a new session bound to a provider
    pub fn for_provider(state: String, code_verifier: String, provider_key: String) -> Self {
        Self {
            provider_key: Some(provider_key),
            ..Self::new(state, code_verifier)
        }
    }

    /// Whether the flow window has closed
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.is_expired_at(ttl, unix_now())
    }

    fn is_expired_at(&self, ttl: Duration, now: u64) -> bool {
        now >= self.created_at.saturating_add(ttl.as_secs())
    }
}

/// Storage interface for pending sessions
pub trait SessionStorage: Send + Sync {
    /// Save a session
    fn save_session(&self, state: &str, session: Session) -> Result<()>;

    /// Get a session by state
    fn get_session(&self, state: &str) -> Result<Option<Session>>;

    /// Remove and return a session, so a state is honoured at most once
    fn take_session(&self, state: &str) -> Result<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, state: &str) -> Result<()>;

    /// Drop every session older than `ttl`, returning how many were removed
    fn purge_expired(&self, ttl: Duration) -> Result<usize>;
}

/// In-memory storage implementation
///
/// Thread-safe, suitable for tests and single-process hosts.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn save_session(&self, state: &str, session: Session) -> Result<()> {
        self.sessions.write().insert(state.to_string(), session);
        Ok(())
    }

    fn get_session(&self, state: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().get(state).cloned())
    }

    fn take_session(&self, state: &str) -> Result<Option<Session>> {
        Ok(self.sessions.write().remove(state))
    }

    fn delete_session(&self, state: &str) -> Result<()> {
        self.sessions.write().remove(state);
        Ok(())
    }

    fn purge_expired(&self, ttl: Duration) -> Result<usize> {
        let now = unix_now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(ttl, now));
        Ok(before - sessions.len())
    }
}

/// File-backed storage so a flow can finish in a different process
///
/// Sessions live in one JSON file under the XDG data directory. Every access
/// holds an advisory lock on `sessions.lock`, shared for reads and exclusive
/// for read-modify-write, so instances in separate threads or processes see
/// each state at most once. Writes go to a temp file renamed into place.
#[derive(Debug)]
pub struct FileStorage {
    base_path: PathBuf,
}

/// Advisory lock held for the duration of one storage operation
struct SessionsLock {
    file: File,
}

impl Drop for SessionsLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileStorage {
    /// Create a file storage under `<data_dir>/<app_name>/`
    ///
    /// `$XDG_DATA_HOME` is checked first, then the platform data directory.
    pub fn new(app_name: &str) -> Result<Self> {
        Self::from_lookup(app_name, |key| std::env::var(key).ok())
    }

    /// Like [`FileStorage::new`], resolving `XDG_DATA_HOME` through `lookup`
    pub fn from_lookup<F>(app_name: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = match lookup("XDG_DATA_HOME") {
            Some(xdg_data) if !xdg_data.is_empty() => PathBuf::from(xdg_data),
            _ => dirs::data_dir().ok_or_else(|| {
                OAuthError::StorageError("Could not determine data directory".into())
            })?,
        };

        Self::with_path(base_dir.join(app_name))
    }

    /// Create a file storage instance with a custom path
    pub fn with_path(path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&path).map_err(|e| {
            OAuthError::StorageError(format!("Failed to create storage directory: {}", e))
        })?;

        Ok(Self { base_path: path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn sessions_path(&self) -> PathBuf {
        self.base_path.join("sessions.json")
    }

    fn lock(&self, exclusive: bool) -> Result<SessionsLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.base_path.join("sessions.lock"))?;

        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }

        Ok(SessionsLock { file })
    }

    fn load(&self) -> Result<HashMap<String, Session>> {
        let path = self.sessions_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Caller must hold the exclusive lock.
    fn store(&self, sessions: &HashMap<String, Session>) -> Result<()> {
        let content = serde_json::to_string_pretty(sessions)?;
        let tmp_path = self.base_path.join("sessions.json.tmp");

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, self.sessions_path())?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn save_session(&self, state: &str, session: Session) -> Result<()> {
        let _lock = self.lock(true)?;
        let mut sessions = self.load()?;
        sessions.insert(state.to_string(), session);
        self.store(&sessions)
    }

    fn get_session(&self, state: &str) -> Result<Option<Session>> {
        let _lock = self.lock(false)?;
        Ok(self.load()?.get(state).cloned())
    }

    fn take_session(&self, state: &str) -> Result<Option<Session>> {
        let _lock = self.lock(true)?;
        let mut sessions = self.load()?;
        let taken = sessions.remove(state);
        if taken.is_some() {
            self.store(&sessions)?;
        }
        Ok(taken)
    }

    fn delete_session(&self, state: &str) -> Result<()> {
        self.take_session(state).map(|_| ())
    }

    fn purge_expired(&self, ttl: Duration) -> Result<usize> {
        let _lock = self.lock(true)?;
        let now = unix_now();
        let mut sessions = self.load()?;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(ttl, now));
        let removed = before - sessions.len();
        if removed > 0 {
            self.store(&sessions)?;
        }
        Ok(removed)
    }
}
