//! Server configuration from the environment

use crate::exercise::{ExerciseKind, RepTargets, DEFAULT_REPS_PER_SET};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub rep_targets: RepTargets,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("GYM_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.gym-supervisor/gym.db"))
            },
            PathBuf::from,
        );

        let port = parse_positive::<u16>(&lookup, "GYM_PORT")?.unwrap_or(DEFAULT_PORT);

        let default_reps =
            parse_positive::<u32>(&lookup, "GYM_REPS_PER_SET")?.unwrap_or(DEFAULT_REPS_PER_SET);
        let mut rep_targets = RepTargets::new(default_reps);
        for kind in ExerciseKind::ALL {
            let var = format!("GYM_REPS_PER_SET_{}", kind.key().to_uppercase());
            if let Some(reps) = parse_positive::<u32>(&lookup, &var)? {
                rep_targets = rep_targets.with_override(kind, reps);
            }
        }

        Ok(Self {
            db_path,
            port,
            rep_targets,
        })
    }
}

fn parse_positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber {
            var: var.to_string(),
            value,
        }),
    }
}
