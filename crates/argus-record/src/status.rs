//! Run status and its transition table

use crate::error::RecordError;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, not yet started
    #[default]
    Idle,
    /// Advancing through stages
    Running,
    /// Halted before an interrupt stage, awaiting resume
    Paused,
    /// Reached the terminal stage
    Completed,
    /// Halted by a stage failure
    Error,
}

impl RunStatus {
    /// `completed` and `error` are absorbing
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Validates a status transition. Staying in the same status is allowed.
pub fn validate_transition(from: RunStatus, to: RunStatus) -> Result<(), RecordError> {
    if from == to || allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(RecordError::IllegalTransition { from, to })
    }
}

/// Statuses reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RunStatus) -> Vec<RunStatus> {
    use RunStatus::*;
    match from {
        Idle => vec![Running, Error],
        Running => vec![Paused, Completed, Error],
        Paused => vec![Running, Error],
        Completed | Error => vec![],
    }
}
