//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{DailyLog, Database, LoggedExercise};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// Storage for daily workout logs
#[async_trait]
pub trait LogStore: Send + Sync {
    /// The user's log dated `today`, if any
    async fn find_today_log(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Option<DailyLog>, String>;

    /// Get a log by id
    #[allow(dead_code)] // API completeness
    async fn get_log(&self, log_id: i64) -> Result<DailyLog, String>;

    /// Replace the whole exercise list of a log
    #[allow(dead_code)] // Used by the routine side and tests
    async fn save_log_exercise_entries(
        &self,
        log_id: i64,
        entries: &[LoggedExercise],
    ) -> Result<(), String>;

    /// Atomically add one completed set to an entry; returns the stored entry
    async fn record_set_completion(
        &self,
        log_id: i64,
        original_exercise_id: i64,
    ) -> Result<LoggedExercise, String>;
}

/// Resolves bearer tokens to users
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Option<i64>, String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LogStore + ?Sized> LogStore for Arc<T> {
    async fn find_today_log(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Option<DailyLog>, String> {
        (**self).find_today_log(user_id, today).await
    }

    async fn get_log(&self, log_id: i64) -> Result<DailyLog, String> {
        (**self).get_log(log_id).await
    }

    async fn save_log_exercise_entries(
        &self,
        log_id: i64,
        entries: &[LoggedExercise],
    ) -> Result<(), String> {
        (**self).save_log_exercise_entries(log_id, entries).await
    }

    async fn record_set_completion(
        &self,
        log_id: i64,
        original_exercise_id: i64,
    ) -> Result<LoggedExercise, String> {
        (**self)
            .record_set_completion(log_id, original_exercise_id)
            .await
    }
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn authenticate(&self, token: &str) -> Result<Option<i64>, String> {
        (**self).authenticate(token).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as `LogStore` and `Authenticator`.
///
/// SQLite calls run on the blocking pool so a slow write stalls only the
/// session waiting on it.
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> crate::db::DbResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| format!("database task failed: {e}"))?
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl LogStore for DatabaseStorage {
    async fn find_today_log(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Option<DailyLog>, String> {
        self.blocking(move |db| db.find_today_log_for_user(user_id, today))
            .await
    }

    async fn get_log(&self, log_id: i64) -> Result<DailyLog, String> {
        self.blocking(move |db| db.get_log(log_id)).await
    }

    async fn save_log_exercise_entries(
        &self,
        log_id: i64,
        entries: &[LoggedExercise],
    ) -> Result<(), String> {
        let entries = entries.to_vec();
        self.blocking(move |db| db.save_log_exercise_entries(log_id, &entries))
            .await
    }

    async fn record_set_completion(
        &self,
        log_id: i64,
        original_exercise_id: i64,
    ) -> Result<LoggedExercise, String> {
        self.blocking(move |db| db.record_set_completion(log_id, original_exercise_id))
            .await
    }
}

#[async_trait]
impl Authenticator for DatabaseStorage {
    async fn authenticate(&self, token: &str) -> Result<Option<i64>, String> {
        let token = token.to_string();
        self.blocking(move |db| db.user_for_token(&token)).await
    }
}
