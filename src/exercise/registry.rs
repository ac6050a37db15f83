//! Exercise name resolution and per-exercise rep targets
//!
//! The registry is built once at startup and shared read-only by every
//! session.

use super::ExerciseKind;
use std::collections::HashMap;

/// Reps per set when neither the daily log nor configuration says otherwise
pub const DEFAULT_REPS_PER_SET: u32 = 10;

/// Names the client may send, mapped to the classifier that counts them
const ALIASES: &[(&str, ExerciseKind)] = &[
    ("curl_l", ExerciseKind::CurlLeft),
    ("curl_r", ExerciseKind::CurlRight),
    ("curl", ExerciseKind::CurlRight),
    ("bicep curl", ExerciseKind::CurlLeft),
    ("dumbbell bicep curl", ExerciseKind::CurlLeft),
    ("shoulder_press", ExerciseKind::ShoulderPress),
    ("dumbbell shoulder press", ExerciseKind::ShoulderPress),
    ("overhead press", ExerciseKind::ShoulderPress),
    ("lateral_raise", ExerciseKind::LateralRaise),
    ("dumbbell lateral raise", ExerciseKind::LateralRaise),
    ("front raise", ExerciseKind::LateralRaise),
    ("squat", ExerciseKind::Squat),
    ("bodyweight squats", ExerciseKind::Squat),
    ("goblet squats", ExerciseKind::Squat),
    ("sit_up", ExerciseKind::SitUp),
    ("leg_raise", ExerciseKind::LegRaise),
];

/// Lowercase and turn each whitespace character into `_`.
pub fn normalize_exercise_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Immutable name → exercise lookup
#[derive(Debug, Clone)]
pub struct ExerciseRegistry {
    by_name: HashMap<String, ExerciseKind>,
}

impl ExerciseRegistry {
    /// Registry with the built-in aliases
    pub fn builtin() -> Self {
        Self::from_aliases(ALIASES.iter().copied())
    }

    pub fn from_aliases<'a>(aliases: impl IntoIterator<Item = (&'a str, ExerciseKind)>) -> Self {
        let by_name = aliases
            .into_iter()
            .map(|(name, kind)| (normalize_exercise_name(name), kind))
            .collect();
        Self { by_name }
    }

    /// Resolve an already-normalized name
    pub fn resolve(&self, normalized: &str) -> Option<ExerciseKind> {
        self.by_name.get(normalized).copied()
    }

    /// All registered names with their kinds, sorted by name
    pub fn entries(&self) -> Vec<(&str, ExerciseKind)> {
        let mut entries: Vec<_> = self
            .by_name
            .iter()
            .map(|(name, kind)| (name.as_str(), *kind))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl Default for ExerciseRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Reps needed to complete one set, per exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepTargets {
    default: u32,
    overrides: HashMap<ExerciseKind, u32>,
}

impl RepTargets {
    pub fn new(default: u32) -> Self {
        Self {
            default: default.max(1),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, kind: ExerciseKind, reps: u32) -> Self {
        self.overrides.insert(kind, reps.max(1));
        self
    }

    pub fn for_kind(&self, kind: ExerciseKind) -> u32 {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }

    pub fn default_reps(&self) -> u32 {
        self.default
    }
}

impl Default for RepTargets {
    fn default() -> Self {
        Self::new(DEFAULT_REPS_PER_SET)
    }
}
