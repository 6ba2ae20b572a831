//! Task parameters for the half-cheetah meta-learning variants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error("direction must be -1.0 or 1.0, got {0}")]
    InvalidDirection(f32),
}

/// Target direction of travel. Serialises as `1.0` / `-1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// Sign applied to the forward velocity.
    #[must_use]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

impl From<Direction> for f32 {
    fn from(direction: Direction) -> Self {
        direction.sign()
    }
}

impl TryFrom<f32> for Direction {
    type Error = TaskError;

    #[allow(clippy::float_cmp)]
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if value == 1.0 {
            Ok(Direction::Forward)
        } else if value == -1.0 {
            Ok(Direction::Backward)
        } else {
            Err(TaskError::InvalidDirection(value))
        }
    }
}

/// A single direction task: `{"direction": ±1.0}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionTask {
    pub direction: Direction,
}

impl DirectionTask {
    pub const FORWARD: Self = Self {
        direction: Direction::Forward,
    };
    pub const BACKWARD: Self = Self {
        direction: Direction::Backward,
    };

    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

/// A goal-velocity task: `{"velocity": v}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityTask {
    pub velocity: f32,
}
