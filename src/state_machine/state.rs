//! Session state types

use crate::exercise::{ExerciseKind, ExerciseRegistry, RepTargets, Stage};
use crate::sync::{LogReference, SeededProgress};
use std::sync::Arc;

/// Lifecycle of one supervision connection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected; persisted progress not loaded yet
    #[default]
    Uninitialized,
    /// Accepting frames
    Active(TrackingState),
    /// Connection gone (terminal)
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    #[allow(dead_code)] // Used in tests
    pub fn tracking(&self) -> Option<&TrackingState> {
        match self {
            SessionState::Active(tracking) => Some(tracking),
            _ => None,
        }
    }
}

/// Per-connection counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingState {
    pub stage: Option<Stage>,
    /// Reps in the current set
    pub rep_count: u32,
    pub sets_completed: u32,
    pub target_sets: u32,
    /// Resolved from the first frame whose exercise name is known
    pub exercise: Option<ExerciseKind>,
    /// Exercise name as stored in the daily log
    pub exercise_name: String,
    /// Where completed sets are recorded; absent when no log was found
    pub log_reference: Option<LogReference>,
    /// Reps per set prescribed by the daily log
    pub log_rep_target: Option<u32>,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            stage: None,
            rep_count: 0,
            sets_completed: 0,
            target_sets: 1,
            exercise: None,
            exercise_name: String::new(),
            log_reference: None,
            log_rep_target: None,
        }
    }
}

impl TrackingState {
    pub fn seeded(progress: SeededProgress) -> Self {
        Self {
            sets_completed: progress.sets_completed,
            target_sets: progress.target_sets.max(1),
            exercise_name: progress.exercise_name,
            log_reference: Some(progress.log_reference),
            log_rep_target: progress.target_reps.filter(|n| *n > 0),
            ..Self::default()
        }
    }

    /// Reps that complete one set: the log's prescription, else configuration
    pub fn reps_per_set(&self, kind: ExerciseKind, targets: &RepTargets) -> u32 {
        self.log_rep_target
            .unwrap_or_else(|| targets.for_kind(kind))
            .max(1)
    }
}

/// Immutable session context
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub user_id: i64,
    /// Exercise identifier from the connection URL
    pub exercise_param: String,
    pub registry: Arc<ExerciseRegistry>,
    pub rep_targets: Arc<RepTargets>,
}

impl SessionContext {
    pub fn new(
        session_id: impl Into<String>,
        user_id: i64,
        exercise_param: impl Into<String>,
        registry: Arc<ExerciseRegistry>,
        rep_targets: Arc<RepTargets>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
            exercise_param: exercise_param.into(),
            registry,
            rep_targets,
        }
    }
}
