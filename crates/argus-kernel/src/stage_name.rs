//! Pipeline state names

use crate::error::ExecutionError;
use argus_stages::{
    StageContract, ANALYZE, DETECT, DRAFT, FEEDBACK, FINALIZE, GATE, INGEST, LOOKUP, PLAN, REDACT,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A state of the pipeline graph
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Structure the raw input
    Ingest,
    /// Mask sensitive values
    Redact,
    /// Extract indicators and categories
    Detect,
    /// Select analyzers
    Plan,
    /// Parallel analyzers and aggregate
    Analyze,
    /// External intelligence
    Lookup,
    /// Write the narrative
    Draft,
    /// Score the narrative
    Gate,
    /// Consolidate revision instructions
    Feedback,
    /// Reverse redaction and finish
    Finalize,
}

impl StageName {
    /// Every stage, in pipeline order
    pub const ALL: [StageName; 10] = [
        Self::Ingest,
        Self::Redact,
        Self::Detect,
        Self::Plan,
        Self::Analyze,
        Self::Lookup,
        Self::Draft,
        Self::Gate,
        Self::Feedback,
        Self::Finalize,
    ];

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.contract().name
    }

    /// Read/write contract of the stage registered under this name
    #[must_use]
    pub fn contract(self) -> &'static StageContract {
        match self {
            Self::Ingest => &INGEST,
            Self::Redact => &REDACT,
            Self::Detect => &DETECT,
            Self::Plan => &PLAN,
            Self::Analyze => &ANALYZE,
            Self::Lookup => &LOOKUP,
            Self::Draft => &DRAFT,
            Self::Gate => &GATE,
            Self::Feedback => &FEEDBACK,
            Self::Finalize => &FINALIZE,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ExecutionError::UnknownStageName {
                name: s.to_string(),
            })
    }
}
