//! Database module for the supervision service
//!
//! Users, auth tokens, workout plans and daily logs. The exercises of a
//! daily log are stored as one JSON document per log row.

mod schema;

pub use schema::*;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt log document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid date in log {log_id}: {value}")]
    InvalidDate { log_id: i64, value: String },
    #[error("Daily log not found: {0}")]
    LogNotFound(i64),
    #[error("Exercise {exercise_id} not found in log {log_id}")]
    ExerciseNotInLog { log_id: i64, exercise_id: i64 },
    #[error("Exercise {exercise_id} appears more than once in log")]
    DuplicateExercise { exercise_id: i64 },
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Raw `daily_logs` row before the document is decoded
struct LogRow {
    id: i64,
    workout_plan_id: i64,
    date: String,
    logged_exercises: String,
    version: i64,
}

impl LogRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workout_plan_id: row.get(1)?,
            date: row.get(2)?,
            logged_exercises: row.get(3)?,
            version: row.get(4)?,
        })
    }

    fn decode(self) -> DbResult<DailyLog> {
        let date = self
            .date
            .parse::<NaiveDate>()
            .map_err(|_| DbError::InvalidDate {
                log_id: self.id,
                value: self.date.clone(),
            })?;
        let logged_exercises = parse_document(&self.logged_exercises)?
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<LoggedExercise>(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(log_id = self.id, error = %e, "Skipping unreadable log entry");
                    None
                }
            })
            .collect();
        Ok(DailyLog {
            id: self.id,
            workout_plan_id: self.workout_plan_id,
            date,
            logged_exercises,
            version: self.version,
        })
    }
}

/// The exercise document must be an array; its entries are decoded one by one
fn parse_document(document: &str) -> DbResult<Vec<Value>> {
    Ok(serde_json::from_str(document)?)
}

const LOG_COLUMNS: &str = "l.id, l.workout_plan_id, l.date, l.logged_exercises, l.version";

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Users & Auth ====================

    /// Create a user
    #[allow(dead_code)] // Written by the routine side; used in tests
    pub fn create_user(&self, username: &str) -> DbResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, Utc::now().to_rfc3339()],
        )?;
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
        })
    }

    /// Issue a bearer token for a user
    #[allow(dead_code)] // Written by the routine side; used in tests
    pub fn create_auth_token(&self, user_id: i64, token: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Resolve a bearer token to its user id
    pub fn user_for_token(&self, token: &str) -> DbResult<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let user_id = conn
            .query_row(
                "SELECT user_id FROM auth_tokens WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }

    // ==================== Plans & Logs ====================

    /// Create a workout plan for a user
    #[allow(dead_code)] // Written by the routine side; used in tests
    pub fn create_workout_plan(&self, user_id: i64, name: &str) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO workout_plans (user_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, name, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Create the log for one plan on one day
    #[allow(dead_code)] // Written by the routine side; used in tests
    pub fn create_daily_log(
        &self,
        workout_plan_id: i64,
        date: NaiveDate,
        entries: &[LoggedExercise],
    ) -> DbResult<DailyLog> {
        ensure_unique_exercises(entries)?;
        let document = serde_json::to_string(entries)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO daily_logs (workout_plan_id, date, logged_exercises, version, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![workout_plan_id, date.to_string(), document, Utc::now().to_rfc3339()],
        )?;

        Ok(DailyLog {
            id: conn.last_insert_rowid(),
            workout_plan_id,
            date,
            logged_exercises: entries.to_vec(),
            version: 0,
        })
    }

    /// The first log dated `today` across the user's workout plans
    pub fn find_today_log_for_user(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> DbResult<Option<DailyLog>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS}
             FROM daily_logs l JOIN workout_plans p ON p.id = l.workout_plan_id
             WHERE p.user_id = ?1 AND l.date = ?2
             ORDER BY l.id
             LIMIT 1"
        ))?;

        let row = stmt
            .query_row(params![user_id, today.to_string()], LogRow::from_row)
            .optional()?;
        row.map(LogRow::decode).transpose()
    }

    /// Get a log by id
    pub fn get_log(&self, log_id: i64) -> DbResult<DailyLog> {
        let conn = self.conn.lock().unwrap();
        Self::get_log_locked(&conn, log_id)
    }

    fn get_log_locked(conn: &Connection, log_id: i64) -> DbResult<DailyLog> {
        conn.query_row(
            &format!("SELECT {LOG_COLUMNS} FROM daily_logs l WHERE l.id = ?1"),
            params![log_id],
            LogRow::from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::LogNotFound(log_id),
            other => DbError::Sqlite(other),
        })?
        .decode()
    }

    /// Replace the whole exercise document of a log.
    ///
    /// Last writer wins: a caller that read the document earlier overwrites
    /// anything written since.
    pub fn save_log_exercise_entries(
        &self,
        log_id: i64,
        entries: &[LoggedExercise],
    ) -> DbResult<()> {
        ensure_unique_exercises(entries)?;
        let document = serde_json::to_string(entries)?;

        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE daily_logs SET logged_exercises = ?1, version = version + 1, updated_at = ?2
             WHERE id = ?3",
            params![document, Utc::now().to_rfc3339(), log_id],
        )?;

        if updated == 0 {
            return Err(DbError::LogNotFound(log_id));
        }
        Ok(())
    }

    /// Add one completed set to a single exercise entry and re-derive its
    /// status. The read and write happen inside one immediate transaction,
    /// so concurrent sessions never lose each other's sets. Other entries
    /// are written back as they were read, unreadable ones included.
    pub fn record_set_completion(
        &self,
        log_id: i64,
        original_exercise_id: i64,
    ) -> DbResult<LoggedExercise> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let document: String = tx
            .query_row(
                "SELECT logged_exercises FROM daily_logs WHERE id = ?1",
                params![log_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::LogNotFound(log_id),
                other => DbError::Sqlite(other),
            })?;
        let mut entries = parse_document(&document)?;

        let (slot, mut entry) = entries
            .iter()
            .enumerate()
            .find_map(|(i, raw)| {
                serde_json::from_value::<LoggedExercise>(raw.clone())
                    .ok()
                    .filter(|e| e.original_exercise_id == original_exercise_id)
                    .map(|e| (i, e))
            })
            .ok_or(DbError::ExerciseNotInLog {
                log_id,
                exercise_id: original_exercise_id,
            })?;
        entry.set_sets_completed(entry.actual_sets_completed + 1);
        entries[slot] = serde_json::to_value(&entry)?;

        tx.execute(
            "UPDATE daily_logs SET logged_exercises = ?1, version = version + 1, updated_at = ?2
             WHERE id = ?3",
            params![
                serde_json::to_string(&entries)?,
                Utc::now().to_rfc3339(),
                log_id
            ],
        )?;
        tx.commit()?;

        Ok(entry)
    }
}

fn ensure_unique_exercises(entries: &[LoggedExercise]) -> DbResult<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.original_exercise_id) {
            return Err(DbError::DuplicateExercise {
                exercise_id: entry.original_exercise_id,
            });
        }
    }
    Ok(())
}
