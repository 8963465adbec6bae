//! In-memory session registry
//!
//! Each browser tab (or terminal run) owns one [`TurnController`]. Sessions
//! live only as long as the process; nothing is persisted. A session ends
//! when its page sends `DELETE`, or when it has been idle longer than the
//! configured limit. Idle sessions are swept on `create` and `get`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::controller::TurnController;
use crate::gateway::Gateways;
use crate::persona::Persona;

/// A controller shared between request handlers
///
/// The mutex serializes interactions within one session.
pub type SharedController = Arc<Mutex<TurnController>>;

struct SessionEntry {
    controller: SharedController,
    last_active: Instant,
}

impl SessionEntry {
    fn is_idle(&self, now: Instant, limit: Duration) -> bool {
        now.duration_since(self.last_active) > limit
    }
}

/// Live sessions keyed by id
pub struct SessionRegistry {
    gateways: Gateways,
    persona: Arc<Persona>,
    idle_limit: Option<Duration>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionRegistry {
    /// Registry whose sessions never expire
    #[must_use]
    pub fn new(gateways: Gateways, persona: Arc<Persona>) -> Self {
        Self {
            gateways,
            persona,
            idle_limit: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Discard sessions idle for longer than `limit` (`None` = never)
    #[must_use]
    pub const fn with_idle_limit(mut self, limit: Option<Duration>) -> Self {
        self.idle_limit = limit;
        self
    }

    #[must_use]
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Start a session with empty history
    pub async fn create(&self) -> (Uuid, SharedController) {
        let controller = TurnController::new(self.gateways.clone(), Arc::clone(&self.persona));
        let id = controller.id();
        let shared = Arc::new(Mutex::new(controller));

        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);
        sessions.insert(
            id,
            SessionEntry {
                controller: Arc::clone(&shared),
                last_active: Instant::now(),
            },
        );
        tracing::info!(session_id = %id, active = sessions.len(), "session created");

        (id, shared)
    }

    /// Look up a session and mark it active
    pub async fn get(&self, id: &Uuid) -> Option<SharedController> {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);

        let entry = sessions.get_mut(id)?;
        entry.last_active = Instant::now();
        Some(Arc::clone(&entry.controller))
    }

    /// End a session, discarding its history
    ///
    /// Returns `false` if no such session existed.
    pub async fn remove(&self, id: &Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, active = sessions.len(), "session ended");
        }
        removed
    }

    /// Number of sessions that have not gone idle
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let sessions = self.sessions.read().await;
        match self.idle_limit {
            Some(limit) => sessions.values().filter(|e| !e.is_idle(now, limit)).count(),
            None => sessions.len(),
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop idle sessions; a session in the middle of a turn is kept
    fn sweep(&self, sessions: &mut HashMap<Uuid, SessionEntry>) {
        let Some(limit) = self.idle_limit else {
            return;
        };
        let now = Instant::now();

        sessions.retain(|id, entry| {
            let busy = entry.controller.try_lock().is_err();
            let keep = busy || !entry.is_idle(now, limit);
            if !keep {
                tracing::info!(session_id = %id, idle_secs = limit.as_secs(), "idle session discarded");
            }
            keep
        });
    }
}
