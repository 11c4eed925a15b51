//! Fan-out errors

use argus_record::{Field, RecordError};
use argus_stages::StageError;

/// Failure of the analyzer fan-out
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    /// Two analyzers wrote the same report key
    #[error("consistency error: `{field}` key `{key}` written more than once")]
    Consistency {
        /// Field holding the keyed map
        field: Field,
        /// Colliding key
        key: String,
    },

    /// An analyzer touched fields outside `analyzer_reports`
    #[error("analyzer `{analyzer}` wrote undeclared fields {fields:?}")]
    ContractViolation {
        /// Analyzer name
        analyzer: String,
        /// Undeclared fields in its update
        fields: Vec<Field>,
    },

    /// An analyzer reported under a key other than its own name
    #[error("analyzer `{analyzer}` wrote reports for {keys:?}")]
    ForeignReport {
        /// Analyzer name
        analyzer: String,
        /// Keys it does not own
        keys: Vec<String>,
    },

    /// An analyzer failed in a way the fan-out does not absorb
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Folding an update hit a merge policy other than a key collision
    #[error("merge failed: {0}")]
    Merge(RecordError),

    /// The concurrency limiter was closed while analyzers were pending
    #[error("analyzer scheduler closed")]
    SchedulerClosed,

    /// A task was cancelled before reporting
    #[error("analyzer task cancelled: {0}")]
    Cancelled(String),
}

impl CompositionError {
    /// Whether this is a key collision between analyzers
    #[inline]
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency { .. })
    }
}

impl From<RecordError> for CompositionError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::KeyCollision { field, key } => Self::Consistency { field, key },
            other => Self::Merge(other),
        }
    }
}
