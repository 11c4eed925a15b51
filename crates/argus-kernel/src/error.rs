//! Executor, graph, configuration and checkpoint errors

use crate::stage_name::StageName;
use argus_composition::CompositionError;
use argus_record::{Field, RecordError, RunStatus};
use argus_stages::StageError;
use std::path::PathBuf;

/// Top-level error of a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// A name does not denote any pipeline stage
    #[error("unknown stage name `{name}`")]
    UnknownStageName {
        /// Offending name
        name: String,
    },

    /// A router chose a stage outside its declared targets
    #[error("router `{router}` chose `{target}`, which is not among its declared targets")]
    UndeclaredRoute {
        /// Router name
        router: &'static str,
        /// Chosen stage
        target: StageName,
    },

    /// The stage graph failed validation
    #[error("invalid pipeline graph: {0}")]
    Graph(#[from] GraphError),

    /// The configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stage returned an error
    #[error(transparent)]
    Stage(#[from] StageError),

    /// The analyzer fan-out failed
    #[error(transparent)]
    Analysis(#[from] CompositionError),

    /// A stage wrote outside its declared write set
    #[error("stage `{stage}` wrote undeclared fields {fields:?}")]
    ContractViolation {
        /// Offending stage
        stage: StageName,
        /// Undeclared fields in its update
        fields: Vec<Field>,
    },

    /// An update broke the record's merge policy
    #[error("record update rejected: {0}")]
    Record(#[from] RecordError),

    /// The checkpoint store failed
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// `start` was called with a run id that already has a checkpoint
    #[error("run `{run_id}` already exists")]
    RunExists {
        /// Run identifier
        run_id: String,
    },

    /// No checkpoint exists for the run
    #[error("run `{run_id}` not found")]
    RunNotFound {
        /// Run identifier
        run_id: String,
    },

    /// `resume` was called on a run that is not paused
    #[error("run `{run_id}` is {status}, not paused")]
    NotPaused {
        /// Run identifier
        run_id: String,
        /// Current status
        status: RunStatus,
    },

    /// A stage failed and the run halted with status `error`
    #[error("run `{run_id}` failed at stage `{stage}`: {source}")]
    StageFailed {
        /// Run identifier
        run_id: String,
        /// Failing stage
        stage: StageName,
        /// Underlying failure
        #[source]
        source: Box<ExecutionError>,
    },
}

impl ExecutionError {
    /// Innermost cause, unwrapping [`ExecutionError::StageFailed`]
    #[must_use]
    pub fn cause(&self) -> &ExecutionError {
        match self {
            Self::StageFailed { source, .. } => source.cause(),
            other => other,
        }
    }

    /// Stage at which the run halted, if it halted in one
    #[inline]
    #[must_use]
    pub fn failed_stage(&self) -> Option<StageName> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Two analyzers wrote the same report key
    #[inline]
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        matches!(self.cause(), Self::Analysis(e) if e.is_consistency())
    }

    /// The caller named a run that cannot take the requested action
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::RunExists { .. } | Self::RunNotFound { .. } | Self::NotPaused { .. }
        )
    }

    /// The pipeline was misassembled; no run can succeed until it is fixed
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.cause(),
            Self::Graph(_) | Self::Config(_) | Self::UnknownStageName { .. } | Self::UndeclaredRoute { .. }
        )
    }
}

/// Stage graph validation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The entry stage has no registered node
    #[error("entry stage `{0}` is not registered")]
    MissingEntry(StageName),

    /// A stage was registered twice
    #[error("stage `{0}` registered twice")]
    DuplicateStage(StageName),

    /// A node reports a different name than the slot it was registered in
    #[error("node `{node}` registered as stage `{stage}`")]
    NameMismatch {
        /// Slot
        stage: StageName,
        /// Name the node reports
        node: &'static str,
    },

    /// An edge or router target refers to a stage with no node
    #[error("stage `{0}` is referenced but not registered")]
    UnregisteredStage(StageName),

    /// A stage has more than one outgoing transition
    #[error("stage `{0}` has more than one outgoing transition")]
    DuplicateTransition(StageName),

    /// A non-terminal stage has no outgoing transition
    #[error("stage `{0}` has no outgoing transition and is not terminal")]
    MissingTransition(StageName),

    /// A terminal stage has an outgoing transition
    #[error("terminal stage `{0}` has an outgoing transition")]
    TerminalTransition(StageName),

    /// A stage cannot be reached from the entry
    #[error("stage `{0}` is unreachable from the entry")]
    Unreachable(StageName),

    /// The graph is cyclic once loop-back edges are removed
    #[error("cycle through stage `{0}` outside the declared loop-back edges")]
    Cycle(StageName),
}

/// Invalid configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The gate threshold lies outside `[0, 1]`
    #[error("gate_threshold must lie in [0, 1], got {0}")]
    InvalidThreshold(f64),

    /// Analyzer concurrency of zero would never run anything
    #[error("analyzer_concurrency must be at least 1")]
    ZeroConcurrency,
}

impl ConfigError {
    /// Whether the file itself could not be read
    #[inline]
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Checkpoint store failure
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Filesystem access failed
    #[error("checkpoint I/O on {path}: {source}")]
    Io {
        /// File or directory path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A checkpoint could not be encoded
    #[error("cannot encode checkpoint: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored checkpoint could not be decoded
    #[error("corrupt checkpoint {path}: {source}")]
    Corrupt {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The run id cannot be used as a storage key
    #[error("invalid run id `{0}`")]
    InvalidRunId(String),
}

impl CheckpointError {
    /// Transient storage failures worth retrying
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failure_exposes_its_cause() {
        let err = ExecutionError::StageFailed {
            run_id: "r1".to_string(),
            stage: StageName::Draft,
            source: Box::new(ExecutionError::ContractViolation {
                stage: StageName::Draft,
                fields: vec![Field::GateVerdict],
            }),
        };
        assert_eq!(err.failed_stage(), Some(StageName::Draft));
        assert!(matches!(err.cause(), ExecutionError::ContractViolation { .. }));
        assert!(err.to_string().contains("failed at stage `draft`"));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn route_errors_are_configuration_errors() {
        let err = ExecutionError::UndeclaredRoute {
            router: "intel",
            target: StageName::Finalize,
        };
        assert!(err.is_configuration());
        assert!(!err.is_consistency());
    }

    #[test]
    fn missing_runs_are_caller_errors() {
        let err = ExecutionError::RunNotFound {
            run_id: "r9".to_string(),
        };
        assert!(err.is_caller_error());
        assert_eq!(err.failed_stage(), None);
    }
}
