//! Field names and the merge policy table
//!
//! Every field of the case record is named here, together with the
//! partition it belongs to and the policy the executor uses when a stage
//! update touches it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named field of the case record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Case identifier
    CaseId,
    /// Raw case payload
    Input,
    /// Structured view of the input
    Derived,
    /// Derived view with sensitive leaves replaced
    Redacted,
    /// Placeholder mapping
    RedactionMap,
    /// Detected risk indicators
    RiskIndicators,
    /// Classified categories
    Categories,
    /// Per-analyzer reports keyed by analyzer name
    AnalyzerReports,
    /// Aggregate over analyzer reports
    AnalysisSummary,
    /// Analyzer selection and routing hints
    Plan,
    /// External lookup results
    LookupResults,
    /// Narrative text
    NarrativeDraft,
    /// Introductory section
    NarrativeIntro,
    /// Ordered reasoning steps
    ReasoningTrace,
    /// Quality gate verdict
    GateVerdict,
    /// Feedback iterations so far
    RevisionCount,
    /// Maximum feedback iterations
    RevisionCeiling,
    /// Human-supplied revision note
    ReviewerNote,
    /// Consolidated instructions for the next draft
    RevisionInstructions,
    /// Run status
    Status,
    /// Trace of completed stage names
    CompletedStages,
    /// De-redacted narrative
    FinalNarrative,
    /// De-redacted introduction
    FinalIntro,
    /// How the run reached finalization
    Finalization,
}

/// Record partition a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Externally supplied payload
    Input,
    /// Structured, unredacted view
    Derived,
    /// Redacted view and its map
    Redacted,
    /// Analysis results
    Analysis,
    /// Planning and routing hints
    Planning,
    /// Narrative draft
    Draft,
    /// Quality gate
    Gate,
    /// Loop and lifecycle control
    Control,
    /// Final output
    Output,
}

/// How an update to a field is merged into the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// May be set once; rewriting an identical value is a no-op
    WriteOnce,
    /// Single writer, later write replaces earlier
    LastWriteWins,
    /// Key-wise union of sub-maps; a repeated key is a collision
    KeyedUnion,
    /// Counter that may never decrease
    Monotonic,
    /// Status validated against the transition table
    Transition,
    /// Sequence extended by each write
    Append,
}

impl Field {
    /// Every field, in record order
    pub const ALL: [Field; 24] = [
        Field::CaseId,
        Field::Input,
        Field::Derived,
        Field::Redacted,
        Field::RedactionMap,
        Field::RiskIndicators,
        Field::Categories,
        Field::AnalyzerReports,
        Field::AnalysisSummary,
        Field::Plan,
        Field::LookupResults,
        Field::NarrativeDraft,
        Field::NarrativeIntro,
        Field::ReasoningTrace,
        Field::GateVerdict,
        Field::RevisionCount,
        Field::RevisionCeiling,
        Field::ReviewerNote,
        Field::RevisionInstructions,
        Field::Status,
        Field::CompletedStages,
        Field::FinalNarrative,
        Field::FinalIntro,
        Field::Finalization,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::CaseId => "case_id",
            Field::Input => "input",
            Field::Derived => "derived",
            Field::Redacted => "redacted",
            Field::RedactionMap => "redaction_map",
            Field::RiskIndicators => "risk_indicators",
            Field::Categories => "categories",
            Field::AnalyzerReports => "analyzer_reports",
            Field::AnalysisSummary => "analysis_summary",
            Field::Plan => "plan",
            Field::LookupResults => "lookup_results",
            Field::NarrativeDraft => "narrative_draft",
            Field::NarrativeIntro => "narrative_intro",
            Field::ReasoningTrace => "reasoning_trace",
            Field::GateVerdict => "gate_verdict",
            Field::RevisionCount => "revision_count",
            Field::RevisionCeiling => "revision_ceiling",
            Field::ReviewerNote => "reviewer_note",
            Field::RevisionInstructions => "revision_instructions",
            Field::Status => "status",
            Field::CompletedStages => "completed_stages",
            Field::FinalNarrative => "final_narrative",
            Field::FinalIntro => "final_intro",
            Field::Finalization => "finalization",
        }
    }

    /// Partition of this field
    #[must_use]
    pub fn partition(self) -> Partition {
        match self {
            Field::CaseId | Field::Input => Partition::Input,
            Field::Derived => Partition::Derived,
            Field::Redacted | Field::RedactionMap => Partition::Redacted,
            Field::RiskIndicators
            | Field::Categories
            | Field::AnalyzerReports
            | Field::AnalysisSummary
            | Field::LookupResults => Partition::Analysis,
            Field::Plan => Partition::Planning,
            Field::NarrativeDraft | Field::NarrativeIntro | Field::ReasoningTrace => {
                Partition::Draft
            }
            Field::GateVerdict => Partition::Gate,
            Field::RevisionCount
            | Field::RevisionCeiling
            | Field::ReviewerNote
            | Field::RevisionInstructions
            | Field::Status
            | Field::CompletedStages => Partition::Control,
            Field::FinalNarrative | Field::FinalIntro | Field::Finalization => Partition::Output,
        }
    }

    /// Merge policy applied when an update touches this field
    #[must_use]
    pub fn merge_policy(self) -> MergePolicy {
        match self {
            Field::CaseId
            | Field::Input
            | Field::Derived
            | Field::Redacted
            | Field::RedactionMap
            | Field::RevisionCeiling
            | Field::FinalNarrative
            | Field::FinalIntro
            | Field::Finalization => MergePolicy::WriteOnce,
            Field::AnalyzerReports => MergePolicy::KeyedUnion,
            Field::RevisionCount => MergePolicy::Monotonic,
            Field::Status => MergePolicy::Transition,
            Field::CompletedStages => MergePolicy::Append,
            _ => MergePolicy::LastWriteWins,
        }
    }

    /// Whether the field holds sensitive, unredacted data
    #[inline]
    #[must_use]
    pub fn is_sensitive(self) -> bool {
        matches!(self, Field::Input | Field::Derived | Field::RedactionMap)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fields_have_distinct_names() {
        let mut names: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Field::ALL.len());
    }

    #[test]
    fn wire_name_matches_serde() {
        for field in Field::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn only_analyzer_reports_is_keyed_union() {
        let keyed: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|f| f.merge_policy() == MergePolicy::KeyedUnion)
            .collect();
        assert_eq!(keyed, vec![Field::AnalyzerReports]);
    }

    #[test]
    fn redaction_partition_is_write_once() {
        assert_eq!(Field::Redacted.merge_policy(), MergePolicy::WriteOnce);
        assert_eq!(Field::RedactionMap.merge_policy(), MergePolicy::WriteOnce);
        assert!(Field::RedactionMap.is_sensitive());
        assert!(!Field::Redacted.is_sensitive());
    }
}
