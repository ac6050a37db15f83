//! Events that can occur in a supervision session

use crate::sync::SeededProgress;
use serde_json::Value;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Synchronizer events
    ProgressLoaded(SeededProgress),
    ProgressUnavailable {
        /// Client-facing reason
        message: String,
    },

    // Client events
    PoseFrame {
        landmarks: Value,
        exercise_name: Option<String>,
    },
    Disconnected,

    // Commit task events
    SetsCommitted {
        persisted_sets: u32,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProgressLoaded(_) => "progress_loaded",
            Event::ProgressUnavailable { .. } => "progress_unavailable",
            Event::PoseFrame { .. } => "pose_frame",
            Event::Disconnected => "disconnected",
            Event::SetsCommitted { .. } => "sets_committed",
        }
    }
}
