//! Stage and collaborator errors

use argus_record::Field;

/// Failure of a single stage or analyzer
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A required field was absent from the stage's view
    #[error("stage `{stage}` requires field `{field}`")]
    MissingInput {
        /// Stage name
        stage: &'static str,
        /// Absent field
        field: Field,
    },

    /// A field was present but could not be interpreted
    #[error("stage `{stage}` could not read field `{field}`: {reason}")]
    MalformedInput {
        /// Stage name
        stage: &'static str,
        /// Offending field
        field: Field,
        /// Parse failure
        reason: String,
    },

    /// An external collaborator call failed and the stage has no fallback
    #[error("stage `{stage}` collaborator failure: {source}")]
    ExternalCollaboratorFailure {
        /// Stage name
        stage: &'static str,
        /// Underlying failure
        #[source]
        source: CollaboratorError,
    },
}

impl StageError {
    /// Recoverable failures are recorded and skipped by the analyzer fan-out;
    /// everything else halts the run
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ExternalCollaboratorFailure { .. })
    }

    /// Stage that raised the error
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MissingInput { stage, .. }
            | Self::MalformedInput { stage, .. }
            | Self::ExternalCollaboratorFailure { stage, .. } => stage,
        }
    }
}

/// Failure reported by a text generator or quality judge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator does not serve this role
    #[error("role `{0}` not supported")]
    Unsupported(String),

    /// The call itself failed
    #[error("call failed: {0}")]
    Failed(String),

    /// The response could not be parsed
    #[error("unparseable response: {0}")]
    InvalidResponse(String),
}

/// Fetch a required field from a stage view
pub fn require<'a, T>(
    stage: &'static str,
    field: Field,
    value: Option<&'a T>,
) -> Result<&'a T, StageError> {
    value.ok_or(StageError::MissingInput { stage, field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_collaborator_failures_are_recoverable() {
        let missing = StageError::MissingInput {
            stage: "detect",
            field: Field::Redacted,
        };
        assert!(!missing.is_recoverable());
        assert_eq!(missing.stage(), "detect");

        let external = StageError::ExternalCollaboratorFailure {
            stage: "country_risk",
            source: CollaboratorError::Failed("timeout".to_string()),
        };
        assert!(external.is_recoverable());
        assert!(external.to_string().contains("timeout"));
    }

    #[test]
    fn require_reports_stage_and_field() {
        let absent: Option<&String> = None;
        let err = require("draft", Field::Plan, absent).unwrap_err();
        assert_eq!(err.to_string(), "stage `draft` requires field `plan`");
    }
}
