//! Per-exercise two-phase rep detectors
//!
//! Each detector watches one signal (a joint angle or a vertical ordering of
//! joints). One threshold marks the rest extreme; the opposite threshold,
//! reached while still at the rest stage, completes a rep. Image `y` grows
//! downward, so "above" means a smaller `y`.

use super::Stage;
use crate::geometry::compute_angle;
use crate::pose::{FrameError, LandmarkFrame, PoseLandmark};

/// Classifier output for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub stage: Option<Stage>,
    pub reps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Side {
    Left,
    Right,
}

/// Shared cycle logic: enter `rest` whenever `at_rest`, count when `at_peak`
/// is seen while at `rest`.
fn advance(
    stage: Option<Stage>,
    reps: u32,
    at_rest: bool,
    at_peak: bool,
    rest: Stage,
    peak: Stage,
) -> Classification {
    let stage = if at_rest { Some(rest) } else { stage };
    if at_peak && stage == Some(rest) {
        return Classification {
            stage: Some(peak),
            reps: reps + 1,
        };
    }
    Classification { stage, reps }
}

// Elbow angle thresholds for curls
const CURL_EXTENDED_DEG: f64 = 160.0;
const CURL_FLEXED_DEG: f64 = 40.0;

/// Bicep curl on one arm: extended elbow is `down`, a full flex from `down`
/// counts and moves to `up`.
pub(super) fn curl(
    frame: &LandmarkFrame,
    side: Side,
    stage: Option<Stage>,
    reps: u32,
) -> Result<Classification, FrameError> {
    let (shoulder, elbow, wrist) = match side {
        Side::Left => (
            PoseLandmark::LeftShoulder,
            PoseLandmark::LeftElbow,
            PoseLandmark::LeftWrist,
        ),
        Side::Right => (
            PoseLandmark::RightShoulder,
            PoseLandmark::RightElbow,
            PoseLandmark::RightWrist,
        ),
    };
    let angle = compute_angle(frame.point(shoulder)?, frame.point(elbow)?, frame.point(wrist)?);

    Ok(advance(
        stage,
        reps,
        angle > CURL_EXTENDED_DEG,
        angle < CURL_FLEXED_DEG,
        Stage::Down,
        Stage::Up,
    ))
}

// The overhead movements report their lowered position as `up` and the
// raised (counting) position as `down` on the wire.
const ARMS_LOWERED: Stage = Stage::Up;
const ARMS_RAISED: Stage = Stage::Down;

/// Shoulder press: both index fingertips below the nose is the lowered
/// position; both above it from there counts.
pub(super) fn shoulder_press(
    frame: &LandmarkFrame,
    stage: Option<Stage>,
    reps: u32,
) -> Result<Classification, FrameError> {
    let right = frame.y(PoseLandmark::RightIndex)?;
    let left = frame.y(PoseLandmark::LeftIndex)?;
    let nose = frame.y(PoseLandmark::Nose)?;

    Ok(advance(
        stage,
        reps,
        right > nose && left > nose,
        right < nose && left < nose,
        ARMS_LOWERED,
        ARMS_RAISED,
    ))
}

/// Lateral or front raise: fingertips against right-shoulder height.
pub(super) fn lateral_raise(
    frame: &LandmarkFrame,
    stage: Option<Stage>,
    reps: u32,
) -> Result<Classification, FrameError> {
    let right = frame.y(PoseLandmark::RightIndex)?;
    let left = frame.y(PoseLandmark::LeftIndex)?;
    let shoulder = frame.y(PoseLandmark::RightShoulder)?;

    Ok(advance(
        stage,
        reps,
        right > shoulder && left > shoulder,
        right < shoulder && left < shoulder,
        ARMS_LOWERED,
        ARMS_RAISED,
    ))
}

const HIPS_LOW: Stage = Stage::Up;
const HIPS_HIGH: Stage = Stage::Down;

/// Squat on the right side: hip below knee is the bottom, standing back up
/// (hip above knee) counts.
pub(super) fn squat(
    frame: &LandmarkFrame,
    stage: Option<Stage>,
    reps: u32,
) -> Result<Classification, FrameError> {
    let hip = frame.y(PoseLandmark::RightHip)?;
    let knee = frame.y(PoseLandmark::RightKnee)?;

    Ok(advance(stage, reps, hip > knee, hip < knee, HIPS_LOW, HIPS_HIGH))
}

const KNEE_BELOW_NOSE: Stage = Stage::Up;
const KNEE_ABOVE_NOSE: Stage = Stage::Down;

/// Sit-up: right knee lower than the nose while lying back, higher than the
/// nose once curled up.
pub(super) fn sit_up(
    frame: &LandmarkFrame,
    stage: Option<Stage>,
    reps: u32,
) -> Result<Classification, FrameError> {
    let nose = frame.y(PoseLandmark::Nose)?;
    let knee = frame.y(PoseLandmark::RightKnee)?;

    Ok(advance(
        stage,
        reps,
        knee > nose,
        knee < nose,
        KNEE_BELOW_NOSE,
        KNEE_ABOVE_NOSE,
    ))
}

const LEG_FLAT_DEG: f64 = 160.0;
const LEG_RAISED_DEG: f64 = 100.0;

/// Leg raise: angle at the right knee between the nose and the right foot.
/// A flat body is `down`; folding below the raised threshold counts.
pub(super) fn leg_raise(
    frame: &LandmarkFrame,
    stage: Option<Stage>,
    reps: u32,
) -> Result<Classification, FrameError> {
    let angle = compute_angle(
        frame.point(PoseLandmark::Nose)?,
        frame.point(PoseLandmark::RightKnee)?,
        frame.point(PoseLandmark::RightFootIndex)?,
    );

    Ok(advance(
        stage,
        reps,
        angle > LEG_FLAT_DEG,
        angle < LEG_RAISED_DEG,
        Stage::Down,
        Stage::Up,
    ))
}
