//! Supported exercises and their repetition classifiers

mod classifier;
mod registry;

pub use classifier::Classification;
pub use registry::{normalize_exercise_name, ExerciseRegistry, RepTargets, DEFAULT_REPS_PER_SET};

use crate::pose::{FrameError, LandmarkFrame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which extreme of the rep cycle the body was last seen at.
///
/// The labels are the wire vocabulary; what each one means anatomically is
/// exercise-specific (see the classifier for each kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Up,
    Down,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Up => "up",
            Stage::Down => "down",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of exercises the engine can count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    CurlLeft,
    CurlRight,
    ShoulderPress,
    LateralRaise,
    Squat,
    SitUp,
    LegRaise,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 7] = [
        ExerciseKind::CurlLeft,
        ExerciseKind::CurlRight,
        ExerciseKind::ShoulderPress,
        ExerciseKind::LateralRaise,
        ExerciseKind::Squat,
        ExerciseKind::SitUp,
        ExerciseKind::LegRaise,
    ];

    /// Canonical lookup key
    pub fn key(self) -> &'static str {
        match self {
            ExerciseKind::CurlLeft => "curl_l",
            ExerciseKind::CurlRight => "curl_r",
            ExerciseKind::ShoulderPress => "shoulder_press",
            ExerciseKind::LateralRaise => "lateral_raise",
            ExerciseKind::Squat => "squat",
            ExerciseKind::SitUp => "sit_up",
            ExerciseKind::LegRaise => "leg_raise",
        }
    }

    /// Advance the rep cycle by one frame.
    ///
    /// Pure: all history flows through `stage` and `reps`. The count grows by
    /// at most one per call, and only on the transition into the completion
    /// stage from the rest stage.
    pub fn classify(
        self,
        frame: &LandmarkFrame,
        stage: Option<Stage>,
        reps: u32,
    ) -> Result<Classification, FrameError> {
        match self {
            ExerciseKind::CurlLeft => classifier::curl(frame, classifier::Side::Left, stage, reps),
            ExerciseKind::CurlRight => {
                classifier::curl(frame, classifier::Side::Right, stage, reps)
            }
            ExerciseKind::ShoulderPress => classifier::shoulder_press(frame, stage, reps),
            ExerciseKind::LateralRaise => classifier::lateral_raise(frame, stage, reps),
            ExerciseKind::Squat => classifier::squat(frame, stage, reps),
            ExerciseKind::SitUp => classifier::sit_up(frame, stage, reps),
            ExerciseKind::LegRaise => classifier::leg_raise(frame, stage, reps),
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
