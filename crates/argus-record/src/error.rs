//! Record merge errors

use crate::field::Field;
use crate::status::RunStatus;

/// Violation of a field's merge policy
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// A write-once field already holds a different value
    #[error("field `{field}` is write-once and already set")]
    WriteOnce {
        /// Offending field
        field: Field,
    },

    /// Two writers produced the same sub-key of a keyed-union field
    #[error("key `{key}` of field `{field}` written twice")]
    KeyCollision {
        /// Keyed-union field
        field: Field,
        /// Colliding key
        key: String,
    },

    /// A monotonic counter would decrease
    #[error("field `{field}` cannot decrease from {from} to {to}")]
    NonMonotonic {
        /// Counter field
        field: Field,
        /// Current value
        from: u32,
        /// Rejected value
        to: u32,
    },

    /// Run status transition not in the allowed table
    #[error("illegal status transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current status
        from: RunStatus,
        /// Requested status
        to: RunStatus,
    },
}

impl RecordError {
    /// Whether this indicates two writers claiming the same key
    #[inline]
    #[must_use]
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::KeyCollision { .. })
    }

    /// Field the violation concerns
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::WriteOnce { field }
            | Self::KeyCollision { field, .. }
            | Self::NonMonotonic { field, .. } => *field,
            Self::IllegalTransition { .. } => Field::Status,
        }
    }
}
