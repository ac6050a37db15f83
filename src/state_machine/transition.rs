//! Pure state transition function

use super::{Effect, Event, FrameRejection, SessionContext, SessionState, TrackingState};
use crate::exercise::normalize_exercise_name;
use crate::pose::{is_empty_payload, FrameError, LandmarkFrame};
use crate::protocol::ServerMessage;
use serde_json::Value;
use thiserror::Error;

/// Longest payload excerpt carried by a malformed-frame error
const SNIPPET_CHARS: usize = 200;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition. The state is left unchanged.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("session not initialized")]
    NotReady,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs, it always produces the same outputs, with no I/O.
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Initialization
        // ============================================================
        (SessionState::Uninitialized, Event::ProgressLoaded(progress)) => {
            let tracking = TrackingState::seeded(progress);
            let initial = ServerMessage::InitialState {
                current_sets_completed: tracking.sets_completed,
                target_sets: tracking.target_sets,
                exercise_name: tracking.exercise_name.clone(),
            };
            Ok(TransitionResult::new(SessionState::Active(tracking))
                .with_effect(Effect::Notify(initial)))
        }

        // Counting still works without a log; nothing will be persisted
        (SessionState::Uninitialized, Event::ProgressUnavailable { message }) => Ok(
            TransitionResult::new(SessionState::Active(TrackingState::default()))
                .with_effect(Effect::notify_error(message)),
        ),

        (SessionState::Uninitialized, Event::PoseFrame { .. }) => Err(TransitionError::NotReady),

        // ============================================================
        // Frame processing
        // ============================================================
        (
            SessionState::Active(tracking),
            Event::PoseFrame {
                landmarks,
                exercise_name,
            },
        ) => process_frame(tracking, context, &landmarks, exercise_name.as_deref()),

        // ============================================================
        // Commit reconciliation
        // ============================================================
        (SessionState::Active(tracking), Event::SetsCommitted { persisted_sets }) => {
            if persisted_sets > tracking.sets_completed {
                let mut next = tracking.clone();
                next.sets_completed = persisted_sets;
                Ok(TransitionResult::new(SessionState::Active(next)))
            } else {
                Ok(TransitionResult::new(state.clone()))
            }
        }

        // ============================================================
        // Close
        // ============================================================
        (SessionState::Closed, Event::Disconnected) => {
            Err(TransitionError::InvalidTransition("already closed".to_string()))
        }
        (_, Event::Disconnected) => Ok(TransitionResult::new(SessionState::Closed)),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} in state {}",
            event.name(),
            state_name(state)
        ))),
    }
}

fn process_frame(
    tracking: &TrackingState,
    context: &SessionContext,
    landmarks: &Value,
    frame_exercise_name: Option<&str>,
) -> Result<TransitionResult, TransitionError> {
    let current = SessionState::Active(tracking.clone());

    if is_empty_payload(landmarks) {
        return Ok(TransitionResult::new(current));
    }

    let kind = match tracking.exercise {
        Some(kind) => kind,
        None => {
            let name = frame_exercise_name.unwrap_or(tracking.exercise_name.as_str());
            let normalized = normalize_exercise_name(name);
            match context.registry.resolve(&normalized) {
                Some(kind) => kind,
                None => {
                    return Ok(TransitionResult::new(current).with_effect(Effect::notify_error(
                        format!("Exercise '{normalized}' not supported for AI counting."),
                    )));
                }
            }
        }
    };

    // Pinned even when this frame turns out to be unusable
    let mut next = tracking.clone();
    next.exercise = Some(kind);

    let frame = match LandmarkFrame::from_value(landmarks) {
        Ok(frame) => frame,
        Err(e) => return Ok(rejected(next, e, landmarks)),
    };
    let classified = match kind.classify(&frame, tracking.stage, tracking.rep_count) {
        Ok(classified) => classified,
        Err(e) => return Ok(rejected(next, e, landmarks)),
    };

    next.stage = classified.stage;
    next.rep_count = classified.reps;

    let mut effects = Vec::new();
    let counted = classified.reps > tracking.rep_count;
    if counted {
        effects.push(Effect::notify_rep(classified.reps, classified.stage));
    }

    if counted && next.rep_count >= next.reps_per_set(kind, &context.rep_targets) {
        next.sets_completed += 1;
        next.rep_count = 0;
        next.stage = None;
        effects.extend(set_completed_effects(&next));
    }

    Ok(TransitionResult::new(SessionState::Active(next)).with_effects(effects))
}

fn set_completed_effects(tracking: &TrackingState) -> Vec<Effect> {
    let mut effects = vec![
        Effect::CommitSets {
            log_reference: tracking.log_reference,
            sets_completed: tracking.sets_completed,
        },
        Effect::Notify(ServerMessage::set_update(
            tracking.sets_completed,
            tracking.target_sets,
        )),
    ];
    if tracking.sets_completed >= tracking.target_sets {
        effects.push(Effect::Notify(ServerMessage::exercise_complete()));
    }
    effects
}

fn rejected(tracking: TrackingState, error: FrameError, landmarks: &Value) -> TransitionResult {
    let rejection = match error {
        FrameError::Malformed(reason) => FrameRejection::Malformed {
            reason,
            snippet: snippet(landmarks),
        },
        other => FrameRejection::Unprocessable(other),
    };
    TransitionResult::new(SessionState::Active(tracking)).with_effect(Effect::RejectFrame(rejection))
}

fn snippet(value: &Value) -> String {
    value.to_string().chars().take(SNIPPET_CHARS).collect()
}

fn state_name(state: &SessionState) -> &'static str {
    match state {
        SessionState::Uninitialized => "uninitialized",
        SessionState::Active(_) => "active",
        SessionState::Closed => "closed",
    }
}
