// src/state.rs

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::quiz::session::QuizSession;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub sessions: SessionRegistry,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// One live (or just-completed, not yet discarded) session plus the handle of
/// the countdown task driving it.
pub struct SessionEntry {
    pub session: QuizSession,
    pub ticker: Option<JoinHandle<()>>,
}

/// In-memory registry of quiz sessions, keyed by an opaque session id. Each
/// session is owned by a single client; the mutex only arbitrates between a
/// request handler and that session's ticker task.
///
/// Entries live until the client discards or retakes them; completed sessions
/// whose client walks away are never reaped, so memory grows with abandoned
/// sessions across a process lifetime. Acceptable at this deployment's scale;
/// a TTL sweep would slot in here if that changes.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: Uuid, entry: SessionEntry) {
        self.inner.lock().await.insert(id, entry);
    }

    /// Runs `f` against the entry, if it still exists. The closure is
    /// synchronous, so the lock is never held across an await point.
    pub async fn with_entry<R>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut SessionEntry) -> R,
    ) -> Option<R> {
        self.inner.lock().await.get_mut(id).map(f)
    }

    pub async fn remove(&self, id: &Uuid) -> Option<SessionEntry> {
        self.inner.lock().await.remove(id)
    }
}
