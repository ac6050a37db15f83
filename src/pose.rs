//! Pose landmark frames as supplied by the client-side pose detector
//!
//! Frames arrive as JSON arrays of `{x, y, z?, visibility?}` objects in the
//! 33-point BlazePose ordering. Only `x` and `y` are used for counting.

use crate::geometry::Point2;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// BlazePose landmark indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const COUNT: usize = 33;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single tracked point
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    #[allow(dead_code)] // Accepted from the detector, unused by the classifiers
    pub z: Option<f64>,
    #[serde(default)]
    #[allow(dead_code)] // Accepted from the detector, unused by the classifiers
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// Why a landmark payload could not be used
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameError {
    /// Payload is not an array of landmark objects with numeric coordinates
    #[error("malformed landmark payload: {0}")]
    Malformed(String),
    /// Payload parsed but does not reach a joint the classifier needs
    #[error("landmark {landmark:?} (index {index}) missing from frame of {len}")]
    MissingLandmark {
        landmark: PoseLandmark,
        index: usize,
        len: usize,
    },
}

/// One snapshot of all landmarks
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    landmarks: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Parse a raw JSON payload.
    ///
    /// Shape and type problems are `Malformed`. Short frames are accepted
    /// here and only fail when a classifier asks for a joint past the end.
    pub fn from_value(value: &Value) -> Result<Self, FrameError> {
        if !value.is_array() {
            return Err(FrameError::Malformed(format!(
                "expected array, got {}",
                json_type_name(value)
            )));
        }
        Vec::<Landmark>::deserialize(value)
            .map(Self::new)
            .map_err(|e| FrameError::Malformed(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn get(&self, landmark: PoseLandmark) -> Result<&Landmark, FrameError> {
        self.landmarks
            .get(landmark.index())
            .ok_or(FrameError::MissingLandmark {
                landmark,
                index: landmark.index(),
                len: self.landmarks.len(),
            })
    }

    pub fn point(&self, landmark: PoseLandmark) -> Result<Point2, FrameError> {
        self.get(landmark).map(Landmark::point)
    }

    pub fn y(&self, landmark: PoseLandmark) -> Result<f64, FrameError> {
        self.get(landmark).map(|l| l.y)
    }
}

/// True when the payload carries nothing to classify (null, empty array, empty object)
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
