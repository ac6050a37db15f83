//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::exercise::{ExerciseKind, ExerciseRegistry, RepTargets};
use crate::geometry::{compute_angle, Point2};
use crate::pose::test_frames::{curl_json, neutral, set, to_json};
use crate::pose::PoseLandmark;
use crate::protocol::ServerMessage;
use crate::sync::{LogReference, SeededProgress};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context(reps_per_set: u32) -> SessionContext {
    SessionContext::new(
        "test-session",
        1,
        "5",
        Arc::new(ExerciseRegistry::builtin()),
        Arc::new(RepTargets::new(reps_per_set)),
    )
}

fn active_state(sets_completed: u32, target_sets: u32) -> SessionState {
    SessionState::Active(TrackingState::seeded(SeededProgress {
        log_reference: LogReference {
            log_id: 1,
            exercise_id: 5,
        },
        sets_completed,
        target_sets,
        target_reps: None,
        exercise_name: "curl".to_string(),
    }))
}

fn squat_json(hip_y: f64, knee_y: f64) -> Value {
    let mut frame = neutral();
    set(&mut frame, PoseLandmark::RightHip, 0.5, hip_y);
    set(&mut frame, PoseLandmark::RightKnee, 0.5, knee_y);
    to_json(&frame)
}

fn count_commits(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::CommitSets { .. }))
        .count()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_point() -> impl Strategy<Value = Point2> {
    (0.0f64..1.0, 0.0f64..1.0).prop_map(|(x, y)| Point2::new(x, y))
}

fn arb_curl_frame() -> impl Strategy<Value = Event> {
    (0.0f64..180.0).prop_map(|degrees| Event::PoseFrame {
        landmarks: curl_json(false, degrees),
        exercise_name: Some("curl".to_string()),
    })
}

/// Frames that swing between the two curl extremes
fn arb_extreme_curl_frame() -> impl Strategy<Value = Event> {
    prop_oneof![Just(170.0), Just(30.0), Just(100.0)].prop_map(|degrees| Event::PoseFrame {
        landmarks: curl_json(false, degrees),
        exercise_name: Some("curl".to_string()),
    })
}

fn arb_junk_frame() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Value::Null),
        Just(json!([])),
        Just(json!("landmarks")),
        Just(json!([{ "x": "a" }])),
        Just(json!([{ "x": 0.1, "y": 0.2 }])),
    ]
    .prop_map(|landmarks| Event::PoseFrame {
        landmarks,
        exercise_name: Some("curl".to_string()),
    })
}

fn arb_committed_event() -> impl Strategy<Value = Event> {
    (0u32..10).prop_map(|persisted_sets| Event::SetsCommitted { persisted_sets })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        6 => arb_extreme_curl_frame(),
        2 => arb_curl_frame(),
        1 => arb_junk_frame(),
        1 => arb_committed_event(),
    ]
}

fn arb_any_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_event(),
        Just(Event::Disconnected),
        Just(Event::ProgressUnavailable {
            message: "Today's workout log not found.".to_string()
        }),
    ]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Uninitialized),
        (0u32..5, 1u32..5).prop_map(|(done, target)| active_state(done, target)),
        Just(SessionState::Closed),
    ]
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: counters stay within bounds after any transition
    #[test]
    fn prop_counters_stay_in_bounds(
        reps_per_set in 1u32..5,
        target_sets in 1u32..4,
        events in proptest::collection::vec(arb_event(), 0..60),
    ) {
        let ctx = test_context(reps_per_set);
        let mut state = active_state(0, target_sets);

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                let t = state.tracking().unwrap();
                prop_assert!(t.rep_count < reps_per_set, "rep count {} not reset", t.rep_count);
                prop_assert!(t.target_sets >= 1);
            }
        }
    }

    // Invariant 2: a frame adds at most one rep, and a rep update always
    // reports the new count
    #[test]
    fn prop_at_most_one_rep_per_frame(
        events in proptest::collection::vec(arb_event(), 0..60),
    ) {
        let ctx = test_context(100);
        let mut state = active_state(0, 1);

        for event in events {
            let before = state.tracking().unwrap().rep_count;
            if let Ok(result) = transition(&state, &ctx, event) {
                let after = result.new_state.tracking().unwrap().rep_count;
                prop_assert!(after == before || after == before + 1);

                let updates: Vec<_> = result.effects.iter().filter_map(|e| match e {
                    Effect::Notify(ServerMessage::RepUpdate { current_reps_this_set, .. }) => {
                        Some(*current_reps_this_set)
                    }
                    _ => None,
                }).collect();
                if after > before {
                    prop_assert_eq!(updates, vec![after]);
                } else {
                    prop_assert!(updates.is_empty());
                }
                state = result.new_state;
            }
        }
    }

    // Invariant 3: sets grow by exactly one per completion, each with one commit
    #[test]
    fn prop_set_completion_commits_once(
        reps_per_set in 1u32..4,
        events in proptest::collection::vec(arb_event(), 0..80),
    ) {
        let ctx = test_context(reps_per_set);
        let mut state = active_state(0, 2);

        for event in events {
            let is_commit_ack = matches!(event, Event::SetsCommitted { .. });
            let before = state.tracking().unwrap().sets_completed;
            if let Ok(result) = transition(&state, &ctx, event) {
                let t = result.new_state.tracking().unwrap();
                let commits = count_commits(&result.effects);
                if is_commit_ack {
                    prop_assert!(t.sets_completed >= before);
                    prop_assert_eq!(commits, 0);
                } else if t.sets_completed > before {
                    prop_assert_eq!(t.sets_completed, before + 1);
                    prop_assert_eq!(t.rep_count, 0);
                    prop_assert_eq!(t.stage, None);
                    prop_assert_eq!(commits, 1);
                } else {
                    prop_assert_eq!(t.sets_completed, before);
                    prop_assert_eq!(commits, 0);
                }
                state = result.new_state;
            }
        }
    }

    // Invariant 4: an errored transition never leaks effects and Closed is terminal
    #[test]
    fn prop_closed_is_terminal(
        state in arb_state(),
        events in proptest::collection::vec(arb_any_event(), 0..20),
    ) {
        let ctx = test_context(3);
        let mut state = state;
        let mut closed = state.is_terminal();

        for event in events {
            match transition(&state, &ctx, event) {
                Ok(result) => {
                    prop_assert!(!closed, "transition accepted after close");
                    state = result.new_state;
                    closed = state.is_terminal();
                }
                Err(_) => {}
            }
        }
    }

    // Invariant 5: exercise_complete only once the target is reached
    #[test]
    fn prop_exercise_complete_only_at_target(
        target_sets in 1u32..4,
        events in proptest::collection::vec(arb_extreme_curl_frame(), 0..60),
    ) {
        let ctx = test_context(1);
        let mut state = active_state(0, target_sets);

        for event in events {
            let result = transition(&state, &ctx, event).unwrap();
            let completed = result.effects.contains(&Effect::Notify(ServerMessage::exercise_complete()));
            let sets = result.new_state.tracking().unwrap().sets_completed;
            let set_done = count_commits(&result.effects) == 1;
            prop_assert_eq!(completed, set_done && sets >= target_sets);
            state = result.new_state;
        }
    }

    // Invariant 6: once resolved, the exercise never changes
    #[test]
    fn prop_exercise_resolved_once(names in proptest::collection::vec("[a-z_]{1,12}", 1..10)) {
        let ctx = test_context(10);
        let first = transition(&active_state(0, 1), &ctx, Event::PoseFrame {
            landmarks: squat_json(0.7, 0.6),
            exercise_name: Some("squat".to_string()),
        }).unwrap();
        let mut state = first.new_state;

        for name in names {
            let result = transition(&state, &ctx, Event::PoseFrame {
                landmarks: squat_json(0.4, 0.6),
                exercise_name: Some(name),
            }).unwrap();
            state = result.new_state;
            prop_assert_eq!(state.tracking().unwrap().exercise, Some(ExerciseKind::Squat));
        }
    }
}

proptest! {
    #[test]
    fn prop_angle_in_range(a in arb_point(), b in arb_point(), c in arb_point()) {
        let angle = compute_angle(a, b, c);
        prop_assume!(!angle.is_nan());
        prop_assert!((0.0..=180.0).contains(&angle), "angle {} out of range", angle);
    }

    #[test]
    fn prop_angle_symmetric(a in arb_point(), b in arb_point(), c in arb_point()) {
        let forward = compute_angle(a, b, c);
        let backward = compute_angle(c, b, a);
        if forward.is_nan() {
            prop_assert!(backward.is_nan());
        } else {
            prop_assert!((forward - backward).abs() < 1e-9);
        }
    }

    // Squat frames parsed from JSON count one rep per rest→peak cycle
    #[test]
    fn prop_squat_counts_cycles(cycles in 0usize..20) {
        let mut stage = None;
        let mut reps = 0;
        let low = crate::pose::LandmarkFrame::from_value(&squat_json(0.7, 0.6)).unwrap();
        let high = crate::pose::LandmarkFrame::from_value(&squat_json(0.4, 0.6)).unwrap();
        for _ in 0..cycles {
            for frame in [&low, &high, &high] {
                let out = ExerciseKind::Squat.classify(frame, stage, reps).unwrap();
                stage = out.stage;
                reps = out.reps;
            }
        }
        prop_assert_eq!(reps as usize, cycles);
    }
}
