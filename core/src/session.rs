//! The authenticated session and where its token is persisted.
//!
//! # Design
//! `Session` is a cheaply clonable handle to a single token slot. Only three
//! paths write to it: a successful login, logout/teardown, and a 401 seen by
//! the request client. Readers take a snapshot of the token per request.
//!
//! Every write bumps the session epoch. Components that cache per-user data
//! (the favorites store) remember the epoch they loaded for and reload when
//! it moves.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

/// Persistent storage for the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Keeps the token in a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Process-local token storage. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.to_string()))),
        }
    }

    pub fn stored(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.stored())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

#[derive(Debug, Default)]
struct TokenSlot {
    token: Option<String>,
    epoch: u64,
}

struct SessionInner {
    slot: RwLock<TokenSlot>,
    store: Box<dyn TokenStore>,
}

/// Shared handle to the current bearer token.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session backed by `store`, restoring a persisted token if one
    /// exists. No network call is made; the token is trusted until the
    /// server rejects it with a 401.
    pub fn init(store: impl TokenStore + 'static) -> Self {
        let token = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load persisted token");
            None
        });
        debug!(restored = token.is_some(), "session initialized");
        Self {
            inner: Arc::new(SessionInner {
                slot: RwLock::new(TokenSlot { token, epoch: 0 }),
                store: Box::new(store),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::init(MemoryTokenStore::default())
    }

    /// Snapshot of the current token.
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn state(&self) -> AuthState {
        if self.read().token.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    /// Incremented on every token change.
    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Drop the token from memory and from the store.
    pub fn teardown(&self) {
        let mut slot = self.write();
        if slot.token.take().is_some() {
            slot.epoch += 1;
        }
        drop(slot);
        self.clear_store();
    }

    pub(crate) fn establish(&self, token: String) {
        if let Err(e) = self.inner.store.save(&token) {
            warn!(error = %e, "failed to persist token, keeping it in memory only");
        }
        let mut slot = self.write();
        slot.token = Some(token);
        slot.epoch += 1;
    }

    /// Tear the session down after the server rejected `rejected`.
    ///
    /// A token installed after the rejected request was built is left alone.
    pub(crate) fn invalidate(&self, rejected: Option<&str>) -> bool {
        let mut slot = self.write();
        if rejected.is_none() || slot.token.as_deref() != rejected {
            return false;
        }
        slot.token = None;
        slot.epoch += 1;
        drop(slot);
        self.clear_store();
        true
    }

    fn clear_store(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "failed to clear persisted token");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TokenSlot> {
        self.inner.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TokenSlot> {
        self.inner.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
