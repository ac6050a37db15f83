//! Progress synchronizer
//!
//! Seeds a session from today's daily log and records each completed set
//! back into it.

use crate::db::{DailyLog, LoggedExercise};
use crate::protocol::{EXERCISE_NOT_IN_LOG_MESSAGE, INIT_FAILED_MESSAGE, LOG_NOT_FOUND_MESSAGE};
use crate::runtime::LogStore;
use chrono::NaiveDate;
use thiserror::Error;

/// Which log entry a session writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogReference {
    pub log_id: i64,
    pub exercise_id: i64,
}

/// Counters loaded from the persisted log at session start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededProgress {
    pub log_reference: LogReference,
    pub sets_completed: u32,
    pub target_sets: u32,
    /// Reps per set prescribed by the plan, if it has one
    pub target_reps: Option<u32>,
    pub exercise_name: String,
}

impl SeededProgress {
    fn from_entry(log: &DailyLog, entry: &LoggedExercise) -> Self {
        Self {
            log_reference: LogReference {
                log_id: log.id,
                exercise_id: entry.original_exercise_id,
            },
            sets_completed: entry.actual_sets_completed,
            target_sets: entry.target_set_count(),
            target_reps: entry.target_rep_count(),
            exercise_name: entry.exercise_name.clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("invalid exercise id: {0:?}")]
    InvalidExerciseId(String),
    #[error("no daily log today for user {user_id}")]
    LogNotFound { user_id: i64 },
    #[error("exercise {exercise_id} not in log {log_id}")]
    ExerciseNotInLog { log_id: i64, exercise_id: i64 },
    #[error("log store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Text shown to the client for this failure
    pub fn client_message(&self) -> &'static str {
        match self {
            SyncError::LogNotFound { .. } => LOG_NOT_FOUND_MESSAGE,
            SyncError::ExerciseNotInLog { .. } => EXERCISE_NOT_IN_LOG_MESSAGE,
            SyncError::InvalidExerciseId(_) | SyncError::Store(_) => INIT_FAILED_MESSAGE,
        }
    }
}

/// Reads and writes session progress through a [`LogStore`]
#[derive(Clone)]
pub struct ProgressSync<S: LogStore> {
    store: S,
}

impl<S: LogStore> ProgressSync<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Find the entry for `exercise_param` in the user's log for `today`.
    pub async fn initialize(
        &self,
        user_id: i64,
        exercise_param: &str,
        today: NaiveDate,
    ) -> Result<SeededProgress, SyncError> {
        let exercise_id: i64 = exercise_param
            .trim()
            .parse()
            .map_err(|_| SyncError::InvalidExerciseId(exercise_param.to_string()))?;

        let log = self
            .store
            .find_today_log(user_id, today)
            .await
            .map_err(SyncError::Store)?
            .ok_or(SyncError::LogNotFound { user_id })?;

        let entry = log.exercise(exercise_id).ok_or(SyncError::ExerciseNotInLog {
            log_id: log.id,
            exercise_id,
        })?;

        let seeded = SeededProgress::from_entry(&log, entry);
        tracing::info!(
            user_id,
            log_id = log.id,
            exercise_id,
            sets_completed = seeded.sets_completed,
            target_sets = seeded.target_sets,
            "Seeded session from daily log"
        );
        Ok(seeded)
    }

    /// Record one more completed set on the referenced entry.
    ///
    /// Returns the entry as persisted. Its count can be ahead of
    /// `session_sets` when another session for the same exercise has also
    /// been committing.
    pub async fn commit(
        &self,
        reference: &LogReference,
        session_sets: u32,
    ) -> Result<LoggedExercise, SyncError> {
        let entry = self
            .store
            .record_set_completion(reference.log_id, reference.exercise_id)
            .await
            .map_err(SyncError::Store)?;

        if entry.actual_sets_completed == session_sets {
            tracing::debug!(
                log_id = reference.log_id,
                exercise_id = reference.exercise_id,
                sets_completed = entry.actual_sets_completed,
                status = ?entry.completed_status,
                "Committed set"
            );
        } else {
            tracing::warn!(
                log_id = reference.log_id,
                exercise_id = reference.exercise_id,
                session_sets,
                persisted_sets = entry.actual_sets_completed,
                "Persisted set count differs from session; another session may be active"
            );
        }
        Ok(entry)
    }
}
