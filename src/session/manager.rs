use crate::session::store::SessionStore;
use crate::session::types::{Session, SessionMap, ensure_session};
use crate::utils::Result;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns the in-memory session map and its snapshot.
///
/// Every mutation goes through [`SessionManager::update`], which persists the
/// whole map before releasing the lock. Snapshots therefore land on disk in
/// the same order as the mutations that produced them.
pub struct SessionManager {
    sessions: Mutex<SessionMap>,
    store: SessionStore,
    in_flight: Arc<StdMutex<HashSet<String>>>,
}

impl SessionManager {
    /// Loads the snapshot and takes ownership of it
    pub async fn open(store: SessionStore) -> Result<Self> {
        let sessions = store.load().await?;
        info!("SessionManager initialized with {} sessions", sessions.len());
        Ok(Self::with_sessions(store, sessions))
    }

    pub fn with_sessions(store: SessionStore, sessions: SessionMap) -> Self {
        Self {
            sessions: Mutex::new(sessions),
            store,
            in_flight: Arc::new(StdMutex::new(HashSet::new())),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Applies `f` to the session of `user_id` (created on first contact) and
    /// persists the full map.
    ///
    /// On a write failure the in-memory change stays applied and the error is
    /// returned to the caller.
    pub async fn update<F, R>(&self, user_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut guard = self.sessions.lock().await;
        let result = f(ensure_session(&mut guard, user_id));
        self.store.save(&guard).await?;
        Ok(result)
    }

    /// Clone of the session for `user_id`, without creating one
    pub async fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.lock().await.get(user_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn snapshot(&self) -> SessionMap {
        self.sessions.lock().await.clone()
    }

    /// Marks a generation as running for `user_id`.
    ///
    /// Returns `None` while another generation for the same user holds its
    /// guard. The mark is released when the guard is dropped.
    pub fn try_begin_generation(&self, user_id: &str) -> Option<GenerationGuard> {
        let mut in_flight = match self.in_flight.lock() {
            Ok(set) => set,
            Err(poisoned) => {
                warn!("In-flight set lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if !in_flight.insert(user_id.to_string()) {
            debug!(user_id = %user_id, "Generation already in flight");
            return None;
        }

        Some(GenerationGuard {
            user_id: user_id.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

/// Per-user generation mark, released on drop
#[derive(Debug)]
pub struct GenerationGuard {
    user_id: String,
    in_flight: Arc<StdMutex<HashSet<String>>>,
}

impl GenerationGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let mut in_flight = match self.in_flight.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&self.user_id);
    }
}
