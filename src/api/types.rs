//! API request and response types

use crate::exercise::ExerciseKind;
use serde::{Deserialize, Serialize};

/// Query string accepted by the supervision socket
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// One exercise name the counter understands
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseInfo {
    pub name: String,
    pub kind: ExerciseKind,
}

/// Response with the supported exercise names
#[derive(Debug, Serialize, Deserialize)]
pub struct ExercisesResponse {
    pub exercises: Vec<ExerciseInfo>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
