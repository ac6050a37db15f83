//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::db::{DailyLog, LoggedExercise};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// In-memory log store
// ============================================================================

struct StoredLog {
    user_id: i64,
    log: DailyLog,
}

/// Log store backed by a map, with switchable failures
#[derive(Default)]
pub struct InMemoryLogStore {
    logs: Mutex<Vec<StoredLog>>,
    tokens: Mutex<HashMap<String, i64>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Record of (log id, exercise id) for every successful set commit
    pub commits: Mutex<Vec<(i64, i64)>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a log for `user_id`; returns its id
    pub fn insert_log(&self, user_id: i64, date: NaiveDate, entries: Vec<LoggedExercise>) -> i64 {
        let mut logs = self.logs.lock().unwrap();
        let id = i64::try_from(logs.len()).unwrap() + 1;
        logs.push(StoredLog {
            user_id,
            log: DailyLog {
                id,
                workout_plan_id: user_id,
                date,
                logged_exercises: entries,
                version: 0,
            },
        });
        id
    }

    pub fn insert_token(&self, token: &str, user_id: i64) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), user_id);
    }

    /// Snapshot of a stored log
    pub fn log(&self, log_id: i64) -> Option<DailyLog> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.log.id == log_id)
            .map(|s| s.log.clone())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn find_today_log(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Option<DailyLog>, String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("read failed".to_string());
        }
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.log.date == today)
            .map(|s| s.log.clone()))
    }

    async fn get_log(&self, log_id: i64) -> Result<DailyLog, String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("read failed".to_string());
        }
        self.log(log_id)
            .ok_or_else(|| format!("Daily log not found: {log_id}"))
    }

    async fn save_log_exercise_entries(
        &self,
        log_id: i64,
        entries: &[LoggedExercise],
    ) -> Result<(), String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("write failed".to_string());
        }
        let mut logs = self.logs.lock().unwrap();
        let stored = logs
            .iter_mut()
            .find(|s| s.log.id == log_id)
            .ok_or_else(|| format!("Daily log not found: {log_id}"))?;
        stored.log.logged_exercises = entries.to_vec();
        stored.log.version += 1;
        Ok(())
    }

    async fn record_set_completion(
        &self,
        log_id: i64,
        original_exercise_id: i64,
    ) -> Result<LoggedExercise, String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("write failed".to_string());
        }
        let mut logs = self.logs.lock().unwrap();
        let stored = logs
            .iter_mut()
            .find(|s| s.log.id == log_id)
            .ok_or_else(|| format!("Daily log not found: {log_id}"))?;
        let entry = stored
            .log
            .logged_exercises
            .iter_mut()
            .find(|e| e.original_exercise_id == original_exercise_id)
            .ok_or_else(|| format!("Exercise {original_exercise_id} not found in log {log_id}"))?;
        entry.set_sets_completed(entry.actual_sets_completed + 1);
        let updated = entry.clone();
        stored.log.version += 1;

        self.commits
            .lock()
            .unwrap()
            .push((log_id, original_exercise_id));
        Ok(updated)
    }
}

#[async_trait]
impl Authenticator for InMemoryLogStore {
    async fn authenticate(&self, token: &str) -> Result<Option<i64>, String> {
        Ok(self.tokens.lock().unwrap().get(token).copied())
    }
}

// ============================================================================
// Session integration tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CompletionStatus;
    use crate::exercise::{ExerciseRegistry, RepTargets, Stage};
    use crate::pose::test_frames::{curl_json, neutral, set, to_json};
    use crate::pose::PoseLandmark;
    use crate::protocol::ServerMessage;
    use crate::runtime::{log_date, SessionHandle, SessionManager};
    use chrono::{DateTime, TimeZone, Utc};
    use crate::state_machine::Event;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    const USER: i64 = 1;
    const EXERCISE_ID: i64 = 5;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
    }

    fn manager(
        store: &Arc<InMemoryLogStore>,
        reps_per_set: u32,
    ) -> Arc<SessionManager<Arc<InMemoryLogStore>>> {
        Arc::new(SessionManager::new(
            store.clone(),
            Arc::new(ExerciseRegistry::builtin()),
            Arc::new(RepTargets::new(reps_per_set)),
        ))
    }

    fn store_with_curls(target_sets: &str) -> (Arc<InMemoryLogStore>, i64) {
        let store = Arc::new(InMemoryLogStore::new());
        let log_id = store.insert_log(
            USER,
            today(),
            vec![LoggedExercise::new(EXERCISE_ID, "Bicep Curl", target_sets)],
        );
        (store, log_id)
    }

    async fn start(manager: &Arc<SessionManager<Arc<InMemoryLogStore>>>) -> SessionHandle {
        manager
            .start_session_on(USER, &EXERCISE_ID.to_string(), today())
            .await
    }

    async fn frame(handle: &SessionHandle, landmarks: Value, name: &str) {
        handle
            .event_tx
            .send(Event::PoseFrame {
                landmarks,
                exercise_name: Some(name.to_string()),
            })
            .await
            .unwrap();
    }

    async fn next(handle: &mut SessionHandle) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .expect("timed out waiting for server message")
            .expect("session closed")
    }

    /// Nothing else arrives within a short window
    async fn assert_quiet(handle: &mut SessionHandle) {
        let res = tokio::time::timeout(Duration::from_millis(100), handle.outbound_rx.recv()).await;
        assert!(res.is_err(), "unexpected message: {res:?}");
    }

    async fn expect_handshake(handle: &mut SessionHandle) -> ServerMessage {
        assert_eq!(next(handle).await, ServerMessage::connection_established());
        next(handle).await
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_log_date_uses_utc_day() {
        let late = Utc.with_ymd_and_hms(2024, 5, 14, 23, 30, 0).unwrap();
        assert_eq!(log_date(late), today());

        // just after midnight in UTC+2 is still the previous UTC day
        let east = DateTime::parse_from_rfc3339("2024-05-15T01:30:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(log_date(east), today());
    }

    #[tokio::test]
    async fn test_start_session_reads_todays_utc_log() {
        let store = Arc::new(InMemoryLogStore::new());
        store.insert_log(
            USER,
            log_date(Utc::now()),
            vec![LoggedExercise::new(EXERCISE_ID, "Squat", "2")],
        );
        let manager = manager(&store, 10);
        let mut handle = manager
            .start_session(USER, &EXERCISE_ID.to_string())
            .await;

        assert_eq!(
            expect_handshake(&mut handle).await,
            ServerMessage::InitialState {
                current_sets_completed: 0,
                target_sets: 2,
                exercise_name: "Squat".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_ten_curls_complete_the_exercise() {
        let (store, log_id) = store_with_curls("1");
        let manager = manager(&store, 10);
        let mut handle = start(&manager).await;

        assert_eq!(
            expect_handshake(&mut handle).await,
            ServerMessage::InitialState {
                current_sets_completed: 0,
                target_sets: 1,
                exercise_name: "Bicep Curl".to_string(),
            }
        );

        for _ in 0..10 {
            frame(&handle, curl_json(false, 170.0), "curl").await;
            frame(&handle, curl_json(false, 30.0), "curl").await;
        }

        for rep in 1..=10 {
            assert_eq!(
                next(&mut handle).await,
                ServerMessage::RepUpdate {
                    current_reps_this_set: rep,
                    stage: Some(Stage::Up),
                }
            );
        }
        assert_eq!(next(&mut handle).await, ServerMessage::set_update(1, 1));
        assert_eq!(next(&mut handle).await, ServerMessage::exercise_complete());
        assert_quiet(&mut handle).await;

        wait_for(|| store.commit_count() == 1).await;
        let entry = store.log(log_id).unwrap().exercise(EXERCISE_ID).cloned().unwrap();
        assert_eq!(entry.actual_sets_completed, 1);
        assert_eq!(entry.completed_status, CompletionStatus::Full);
    }

    #[tokio::test]
    async fn test_seeded_progress_continues_from_log() {
        let store = Arc::new(InMemoryLogStore::new());
        let mut entry = LoggedExercise::new(EXERCISE_ID, "Squat", "2-3");
        entry.set_sets_completed(2);
        let log_id = store.insert_log(USER, today(), vec![entry]);
        let manager = manager(&store, 1);
        let mut handle = start(&manager).await;

        assert_eq!(
            expect_handshake(&mut handle).await,
            ServerMessage::InitialState {
                current_sets_completed: 2,
                target_sets: 3,
                exercise_name: "Squat".to_string(),
            }
        );

        let mut low = neutral();
        set(&mut low, PoseLandmark::RightHip, 0.5, 0.7);
        set(&mut low, PoseLandmark::RightKnee, 0.5, 0.6);
        let mut high = low.clone();
        set(&mut high, PoseLandmark::RightHip, 0.5, 0.4);

        frame(&handle, to_json(&low), "Bodyweight Squats").await;
        frame(&handle, to_json(&high), "Bodyweight Squats").await;

        assert!(matches!(next(&mut handle).await, ServerMessage::RepUpdate { .. }));
        assert_eq!(next(&mut handle).await, ServerMessage::set_update(3, 3));
        assert_eq!(next(&mut handle).await, ServerMessage::exercise_complete());

        wait_for(|| store.commit_count() == 1).await;
        let stored = store.log(log_id).unwrap();
        assert_eq!(stored.exercise(EXERCISE_ID).unwrap().actual_sets_completed, 3);
    }

    #[tokio::test]
    async fn test_unsupported_exercise_errors_on_every_frame() {
        let (store, _) = store_with_curls("3");
        let manager = manager(&store, 10);
        let mut handle = start(&manager).await;
        expect_handshake(&mut handle).await;

        for degrees in [170.0, 30.0, 170.0, 30.0] {
            frame(&handle, curl_json(false, degrees), "tricep_kickback").await;
        }
        for _ in 0..4 {
            assert_eq!(
                next(&mut handle).await,
                ServerMessage::error("Exercise 'tricep_kickback' not supported for AI counting.")
            );
        }
        assert_quiet(&mut handle).await;
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_log_keeps_session_open() {
        let store = Arc::new(InMemoryLogStore::new());
        let manager = manager(&store, 1);
        let mut handle = start(&manager).await;

        assert_eq!(
            expect_handshake(&mut handle).await,
            ServerMessage::error("Today's workout log not found.")
        );

        // still counting, nothing persisted
        frame(&handle, curl_json(false, 170.0), "curl").await;
        frame(&handle, curl_json(false, 30.0), "curl").await;
        assert!(matches!(next(&mut handle).await, ServerMessage::RepUpdate { .. }));
        assert_eq!(next(&mut handle).await, ServerMessage::set_update(1, 1));
        assert_eq!(next(&mut handle).await, ServerMessage::exercise_complete());
        assert_eq!(store.commit_count(), 0);
        assert_eq!(manager.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_exercise_missing_from_log() {
        let store = Arc::new(InMemoryLogStore::new());
        store.insert_log(USER, today(), vec![LoggedExercise::new(99, "Squat", "3")]);
        let manager = manager(&store, 10);
        let mut handle = start(&manager).await;

        assert_eq!(
            expect_handshake(&mut handle).await,
            ServerMessage::error("Exercise not found in today's log.")
        );
    }

    #[tokio::test]
    async fn test_store_failure_on_initialize() {
        let (store, _) = store_with_curls("3");
        store.fail_reads(true);
        let manager = manager(&store, 10);
        let mut handle = start(&manager).await;

        assert_eq!(
            expect_handshake(&mut handle).await,
            ServerMessage::error("Error initializing supervision state.")
        );
    }

    #[tokio::test]
    async fn test_bad_frames_do_not_end_session() {
        let (store, _) = store_with_curls("3");
        let manager = manager(&store, 10);
        let mut handle = start(&manager).await;
        expect_handshake(&mut handle).await;

        // malformed shape: dropped silently
        frame(&handle, json!({ "nose": [0.1, 0.2] }), "curl").await;
        frame(&handle, json!([{ "x": "a", "y": 1 }]), "curl").await;
        // empty: ignored
        frame(&handle, json!([]), "curl").await;
        // too short for the elbow: generic error
        let mut short = neutral();
        short.truncate(5);
        frame(&handle, to_json(&short), "curl").await;

        assert_eq!(
            next(&mut handle).await,
            ServerMessage::error("Error processing pose.")
        );

        frame(&handle, curl_json(false, 170.0), "curl").await;
        frame(&handle, curl_json(false, 30.0), "curl").await;
        assert_eq!(
            next(&mut handle).await,
            ServerMessage::RepUpdate {
                current_reps_this_set: 1,
                stage: Some(Stage::Up),
            }
        );
    }

    #[tokio::test]
    async fn test_commit_failure_is_not_reported_to_client() {
        let (store, log_id) = store_with_curls("2");
        store.fail_writes(true);
        let manager = manager(&store, 1);
        let mut handle = start(&manager).await;
        expect_handshake(&mut handle).await;

        frame(&handle, curl_json(false, 170.0), "curl").await;
        frame(&handle, curl_json(false, 30.0), "curl").await;
        assert!(matches!(next(&mut handle).await, ServerMessage::RepUpdate { .. }));
        assert_eq!(next(&mut handle).await, ServerMessage::set_update(1, 2));
        assert_quiet(&mut handle).await;

        let stored = store.log(log_id).unwrap();
        assert_eq!(stored.exercise(EXERCISE_ID).unwrap().actual_sets_completed, 0);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_both_count() {
        let (store, log_id) = store_with_curls("3");
        let manager = manager(&store, 1);
        let mut first = start(&manager).await;
        let mut second = start(&manager).await;
        expect_handshake(&mut first).await;
        expect_handshake(&mut second).await;
        assert_eq!(manager.active_sessions().await, 2);

        for handle in [&first, &second] {
            frame(handle, curl_json(false, 170.0), "curl").await;
            frame(handle, curl_json(false, 30.0), "curl").await;
        }
        for handle in [&mut first, &mut second] {
            assert!(matches!(next(handle).await, ServerMessage::RepUpdate { .. }));
            // each session only knows about its own set
            assert_eq!(next(handle).await, ServerMessage::set_update(1, 3));
        }

        wait_for(|| store.commit_count() == 2).await;
        let stored = store.log(log_id).unwrap();
        assert_eq!(stored.exercise(EXERCISE_ID).unwrap().actual_sets_completed, 2);
    }

    #[tokio::test]
    async fn test_stale_whole_document_writes_lose_updates() {
        let (store, log_id) = store_with_curls("3");

        // both read before either writes
        let mut a = store.get_log(log_id).await.unwrap();
        let mut b = store.get_log(log_id).await.unwrap();
        a.logged_exercises[0].set_sets_completed(1);
        b.logged_exercises[0].set_sets_completed(1);

        store
            .save_log_exercise_entries(log_id, &a.logged_exercises)
            .await
            .unwrap();
        store
            .save_log_exercise_entries(log_id, &b.logged_exercises)
            .await
            .unwrap();

        // two sets were done, the log shows whichever write landed last
        let stored = store.log(log_id).unwrap();
        assert_eq!(stored.exercise(EXERCISE_ID).unwrap().actual_sets_completed, 1);
    }

    #[tokio::test]
    async fn test_disconnect_ends_session() {
        let (store, _) = store_with_curls("3");
        let manager = manager(&store, 10);
        let mut handle = start(&manager).await;
        expect_handshake(&mut handle).await;

        handle.event_tx.send(Event::Disconnected).await.unwrap();
        let closed = tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .unwrap();
        assert!(closed.is_none());

        for _ in 0..100 {
            if manager.active_sessions().await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session was not deregistered");
    }

    #[tokio::test]
    async fn test_dropping_sender_ends_session() {
        let (store, _) = store_with_curls("3");
        let manager = manager(&store, 10);
        let SessionHandle {
            event_tx,
            mut outbound_rx,
            ..
        } = start(&manager).await;
        drop(event_tx);

        let mut received = Vec::new();
        while let Ok(Some(msg)) =
            tokio::time::timeout(Duration::from_secs(2), outbound_rx.recv()).await
        {
            received.push(msg);
        }
        assert_eq!(received.len(), 2, "{received:?}");
    }
}
