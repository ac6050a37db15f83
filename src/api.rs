//! HTTP API for the supervision service
//!
//! The WebSocket endpoint is the transport for supervision sessions.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::exercise::{ExerciseRegistry, RepTargets};
use crate::runtime::{Authenticator, LogStore, SessionManager, SharedSessionManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SharedSessionManager>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new<T>(storage: T, registry: ExerciseRegistry, rep_targets: RepTargets) -> Self
    where
        T: LogStore + Authenticator + 'static,
    {
        let storage = Arc::new(storage);
        let store: Arc<dyn LogStore> = storage.clone();
        Self {
            sessions: Arc::new(SessionManager::new(
                store,
                Arc::new(registry),
                Arc::new(rep_targets),
            )),
            auth: storage,
        }
    }
}
