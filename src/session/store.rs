//! In-memory registry of live sessions.

use super::{Session, Workspace};
use crate::error::{Result, SvarError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Shared handle to one session. Events on the same session are serialized by the mutex.
pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_used: StdMutex<Instant>,
}

impl Entry {
    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

/// Registry of sessions keyed by id.
pub struct SessionStore {
    root: PathBuf,
    sessions: RwLock<HashMap<Uuid, Entry>>,
}

impl SessionStore {
    /// Create a store whose session workspaces live under `root`.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create and register a new session.
    pub fn create(&self) -> Result<SessionHandle> {
        let session = Session::new(Workspace::create(&self.root)?);
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Entry {
                    handle: handle.clone(),
                    last_used: StdMutex::new(Instant::now()),
                },
            );

        debug!(%id, "Created session");
        Ok(handle)
    }

    /// Look up a session and mark it as used.
    pub fn get(&self, id: &Uuid) -> Result<SessionHandle> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions
            .get(id)
            .ok_or_else(|| SvarError::SessionNotFound(id.to_string()))?;
        entry.touch();
        Ok(entry.handle.clone())
    }

    /// Drop a session. Its workspace is removed once the last handle goes away.
    pub fn remove(&self, id: &Uuid) -> Result<()> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| debug!(%id, "Removed session"))
            .ok_or_else(|| SvarError::SessionNotFound(id.to_string()))
    }

    /// Drop every session unused for at least `max_idle`. Returns how many were dropped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = entry.idle_for() < max_idle;
            if !keep {
                debug!(%id, "Evicted idle session");
            }
            keep
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
