//! Database schema and record types

use chrono::NaiveDate;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_tokens (
    token TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS workout_plans (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_workout_plans_user ON workout_plans(user_id);

CREATE TABLE IF NOT EXISTS daily_logs (
    id INTEGER PRIMARY KEY,
    workout_plan_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    logged_exercises TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,

    UNIQUE (workout_plan_id, date),
    FOREIGN KEY (workout_plan_id) REFERENCES workout_plans(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_daily_logs_date ON daily_logs(date);
";

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// One day's workout record for a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: i64,
    pub workout_plan_id: i64,
    pub date: NaiveDate,
    pub logged_exercises: Vec<LoggedExercise>,
    /// Bumped on every write
    pub version: i64,
}

impl DailyLog {
    pub fn exercise(&self, original_exercise_id: i64) -> Option<&LoggedExercise> {
        self.logged_exercises
            .iter()
            .find(|e| e.original_exercise_id == original_exercise_id)
    }
}

/// Progress of a single exercise inside a daily log.
///
/// Unknown fields written by other parts of the application are kept in
/// `extra` so a whole-document write does not drop them. Only the id is
/// required; the other known fields fall back to their defaults when they
/// hold a value of the wrong type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedExercise {
    #[serde(deserialize_with = "exercise_id")]
    pub original_exercise_id: i64,
    #[serde(default, deserialize_with = "or_default")]
    pub exercise_name: String,
    #[serde(default, deserialize_with = "or_default")]
    pub target_sets: Option<TargetCount>,
    #[serde(
        default,
        deserialize_with = "or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_reps: Option<TargetCount>,
    #[serde(default, deserialize_with = "or_default")]
    pub actual_sets_completed: u32,
    #[serde(default, deserialize_with = "or_default")]
    pub completed_status: CompletionStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoggedExercise {
    pub fn new(original_exercise_id: i64, exercise_name: impl Into<String>, target_sets: &str) -> Self {
        Self {
            original_exercise_id,
            exercise_name: exercise_name.into(),
            target_sets: Some(TargetCount::Text(target_sets.to_string())),
            target_reps: None,
            actual_sets_completed: 0,
            completed_status: CompletionStatus::Pending,
            extra: Map::new(),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_target_reps(mut self, target_reps: &str) -> Self {
        self.target_reps = Some(TargetCount::Text(target_reps.to_string()));
        self
    }

    /// Goal number of sets; ranges use their upper bound, anything
    /// unparseable (or zero) counts as a single set.
    pub fn target_set_count(&self) -> u32 {
        self.target_sets
            .as_ref()
            .and_then(TargetCount::upper_bound)
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }

    /// Prescribed reps per set, when the plan carries one
    pub fn target_rep_count(&self) -> Option<u32> {
        self.target_reps
            .as_ref()
            .and_then(TargetCount::upper_bound)
            .filter(|n| *n > 0)
    }

    /// Store a new completed-set count and re-derive the status
    pub fn set_sets_completed(&mut self, sets_completed: u32) {
        self.actual_sets_completed = sets_completed;
        self.completed_status = CompletionStatus::derive(sets_completed, self.target_set_count());
    }
}

/// Integer id, also accepted as a numeric string
fn exercise_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("exercise id {n} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("exercise id {s:?} is not an integer"))),
        other => Err(D::Error::custom(format!("exercise id must be an integer, got {other}"))),
    }
}

fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A prescribed count as stored by the routine side: `3`, `"3"` or `"3-4"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetCount {
    Number(u32),
    Text(String),
}

impl TargetCount {
    /// The count, or the upper bound of a `low-high` range
    pub fn upper_bound(&self) -> Option<u32> {
        match self {
            TargetCount::Number(n) => Some(*n),
            TargetCount::Text(text) => text.rsplit('-').next()?.trim().parse().ok(),
        }
    }
}

/// Per-exercise completion as shown on the workout summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    #[default]
    Pending,
    Partial,
    Full,
}

impl CompletionStatus {
    pub fn derive(completed: u32, target: u32) -> Self {
        if completed >= target {
            CompletionStatus::Full
        } else if completed > 0 {
            CompletionStatus::Partial
        } else {
            CompletionStatus::Pending
        }
    }
}
