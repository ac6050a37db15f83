//! Runtime for supervision sessions
//!
//! One tokio task per connected client. The transport feeds events in
//! through a channel and reads server messages from another.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::exercise::{ExerciseRegistry, RepTargets};
use crate::protocol::ServerMessage;
use crate::state_machine::{Event, SessionContext};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Manager over a type-erased store, as held by the HTTP layer
pub type SharedSessionManager = SessionManager<Arc<dyn LogStore>>;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Handle the transport uses to talk to a running session
pub struct SessionHandle {
    pub session_id: String,
    pub event_tx: mpsc::Sender<Event>,
    pub outbound_rx: mpsc::Receiver<ServerMessage>,
}

/// Who a live session belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    user_id: i64,
    exercise_param: String,
}

/// Day that selects a user's daily log. Logs are dated in UTC, not server-local time.
pub fn log_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Manager for all supervision sessions
pub struct SessionManager<S>
where
    S: LogStore + Clone + 'static,
{
    store: S,
    registry: Arc<ExerciseRegistry>,
    rep_targets: Arc<RepTargets>,
    sessions: RwLock<HashMap<String, SessionKey>>,
}

impl<S> SessionManager<S>
where
    S: LogStore + Clone + 'static,
{
    pub fn new(store: S, registry: Arc<ExerciseRegistry>, rep_targets: Arc<RepTargets>) -> Self {
        Self {
            store,
            registry,
            rep_targets,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ExerciseRegistry> {
        &self.registry
    }

    /// Start a session against today's log
    pub async fn start_session(
        self: &Arc<Self>,
        user_id: i64,
        exercise_param: &str,
    ) -> SessionHandle {
        let today = log_date(Utc::now());
        self.start_session_on(user_id, exercise_param, today).await
    }

    /// Start a session that reads and writes the log dated `today`
    pub async fn start_session_on(
        self: &Arc<Self>,
        user_id: i64,
        exercise_param: &str,
        today: NaiveDate,
    ) -> SessionHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let key = SessionKey {
            user_id,
            exercise_param: exercise_param.to_string(),
        };

        {
            let mut sessions = self.sessions.write().await;
            let concurrent = sessions.values().filter(|k| **k == key).count();
            if concurrent > 0 {
                tracing::warn!(
                    user_id,
                    exercise_id = %exercise_param,
                    concurrent,
                    "Another session is already tracking this exercise; set counts will be shared"
                );
            }
            sessions.insert(session_id.clone(), key);
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

        let context = SessionContext::new(
            session_id.clone(),
            user_id,
            exercise_param,
            self.registry.clone(),
            self.rep_targets.clone(),
        );
        let runtime = SessionRuntime::new(
            context,
            self.store.clone(),
            today,
            event_rx,
            event_tx.downgrade(),
            outbound_tx,
        );

        let manager = Arc::clone(self);
        let id = session_id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            manager.sessions.write().await.remove(&id);
        });

        SessionHandle {
            session_id,
            event_tx,
            outbound_rx,
        }
    }

    /// Number of live sessions
    #[allow(dead_code)] // Used in tests
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
