//! Effects produced by state transitions

use crate::exercise::Stage;
use crate::pose::FrameError;
use crate::protocol::ServerMessage;
use crate::sync::LogReference;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message to the connected client
    Notify(ServerMessage),

    /// Record a completed set (spawns as background task)
    CommitSets {
        log_reference: Option<LogReference>,
        sets_completed: u32,
    },

    /// Drop a frame that produced no classification
    RejectFrame(FrameRejection),
}

/// Why a landmark frame was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum FrameRejection {
    /// Wrong shape; logged, the client is not told
    Malformed { reason: String, snippet: String },
    /// Parsed but unusable by the classifier; the client gets a generic error
    Unprocessable(FrameError),
}

impl Effect {
    pub fn notify_error(message: impl Into<String>) -> Self {
        Effect::Notify(ServerMessage::error(message))
    }

    pub fn notify_rep(reps: u32, stage: Option<Stage>) -> Self {
        Effect::Notify(ServerMessage::RepUpdate {
            current_reps_this_set: reps,
            stage,
        })
    }
}
