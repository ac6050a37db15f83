//! WebSocket message types for the supervision channel
//!
//! Both directions are JSON objects tagged by `type`.

use crate::exercise::Stage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONNECTED_MESSAGE: &str = "Supervision connected!";
pub const LOG_NOT_FOUND_MESSAGE: &str = "Today's workout log not found.";
pub const EXERCISE_NOT_IN_LOG_MESSAGE: &str = "Exercise not found in today's log.";
pub const INIT_FAILED_MESSAGE: &str = "Error initializing supervision state.";
pub const PROCESSING_ERROR_MESSAGE: &str = "Error processing pose.";
pub const MALFORMED_MESSAGE: &str = "Malformed message.";
pub const EXERCISE_COMPLETE_MESSAGE: &str = "Exercise complete! Well done!";

/// Client → server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    PoseLandmarks {
        #[serde(default)]
        landmarks: Value,
        #[serde(default)]
        exercise_name: Option<String>,
    },
    /// Any other message type; ignored
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Server → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionEstablished {
        message: String,
    },
    InitialState {
        current_sets_completed: u32,
        target_sets: u32,
        exercise_name: String,
    },
    RepUpdate {
        current_reps_this_set: u32,
        stage: Option<Stage>,
    },
    SetUpdate {
        sets_completed: u32,
        total_target_sets: u32,
        message: String,
    },
    ExerciseComplete {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn connection_established() -> Self {
        ServerMessage::ConnectionEstablished {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn set_update(sets_completed: u32, total_target_sets: u32) -> Self {
        ServerMessage::SetUpdate {
            sets_completed,
            total_target_sets,
            message: format!("Set {sets_completed} complete!"),
        }
    }

    pub fn exercise_complete() -> Self {
        ServerMessage::ExerciseComplete {
            message: EXERCISE_COMPLETE_MESSAGE.to_string(),
        }
    }

    /// Wire name of this message
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ConnectionEstablished { .. } => "connection_established",
            ServerMessage::InitialState { .. } => "initial_state",
            ServerMessage::RepUpdate { .. } => "rep_update",
            ServerMessage::SetUpdate { .. } => "set_update",
            ServerMessage::ExerciseComplete { .. } => "exercise_complete",
            ServerMessage::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","message":"serialization failed"}"#.to_string())
    }
}
