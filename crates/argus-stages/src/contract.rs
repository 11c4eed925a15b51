//! Read/write contracts
//!
//! Every stage declares the fields it may see and the fields it may write.
//! The executor projects the record to `reads` before invoking a stage and
//! rejects an update that touches anything outside `writes`.

use argus_record::Field;

/// Declared field access of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageContract {
    /// Stage name
    pub name: &'static str,
    /// Fields visible to the stage
    pub reads: &'static [Field],
    /// Fields the stage may write
    pub writes: &'static [Field],
}

impl StageContract {
    /// Whether the stage may write `field`
    #[inline]
    #[must_use]
    pub fn may_write(&self, field: Field) -> bool {
        self.writes.contains(&field)
    }

    /// Whether the stage may read `field`
    #[inline]
    #[must_use]
    pub fn may_read(&self, field: Field) -> bool {
        self.reads.contains(&field)
    }

    /// Fields in `touched` the stage did not declare
    #[must_use]
    pub fn undeclared_writes(&self, touched: &[Field]) -> Vec<Field> {
        touched
            .iter()
            .copied()
            .filter(|f| !self.may_write(*f))
            .collect()
    }
}

/// Contract shared by every analyzer
pub const ANALYZER: StageContract = StageContract {
    name: "analyzer",
    reads: &[Field::Redacted],
    writes: &[Field::AnalyzerReports],
};

/// Structure the raw input
pub const INGEST: StageContract = StageContract {
    name: "ingest",
    reads: &[Field::CaseId, Field::Input],
    writes: &[Field::Derived],
};

/// Replace sensitive values with placeholders
pub const REDACT: StageContract = StageContract {
    name: "redact",
    reads: &[Field::Derived],
    writes: &[Field::Redacted, Field::RedactionMap],
};

/// Extract risk indicators and categories
pub const DETECT: StageContract = StageContract {
    name: "detect",
    reads: &[Field::Redacted],
    writes: &[Field::RiskIndicators, Field::Categories],
};

/// Select analyzers and routing hints
pub const PLAN: StageContract = StageContract {
    name: "plan",
    reads: &[Field::Redacted, Field::RiskIndicators, Field::Categories],
    writes: &[Field::Plan],
};

/// Fan out to analyzers and aggregate
pub const ANALYZE: StageContract = StageContract {
    name: "analyze",
    reads: &[Field::Redacted, Field::Plan],
    writes: &[Field::AnalyzerReports, Field::AnalysisSummary],
};

/// Gather external intelligence
pub const LOOKUP: StageContract = StageContract {
    name: "lookup",
    reads: &[Field::Redacted, Field::Plan],
    writes: &[Field::LookupResults],
};

/// Write the narrative
pub const DRAFT: StageContract = StageContract {
    name: "draft",
    reads: &[
        Field::Redacted,
        Field::RiskIndicators,
        Field::Categories,
        Field::AnalyzerReports,
        Field::AnalysisSummary,
        Field::Plan,
        Field::LookupResults,
        Field::RevisionCount,
        Field::RevisionInstructions,
        Field::ReviewerNote,
    ],
    writes: &[
        Field::NarrativeDraft,
        Field::NarrativeIntro,
        Field::ReasoningTrace,
    ],
};

/// Score the narrative
pub const GATE: StageContract = StageContract {
    name: "gate",
    reads: &[
        Field::NarrativeDraft,
        Field::Redacted,
        Field::RiskIndicators,
        Field::Categories,
    ],
    writes: &[Field::GateVerdict],
};

/// Consolidate revision instructions
pub const FEEDBACK: StageContract = StageContract {
    name: "feedback",
    reads: &[Field::GateVerdict, Field::ReviewerNote, Field::RevisionCount],
    writes: &[Field::RevisionInstructions, Field::RevisionCount],
};

/// Reverse redaction on the accepted narrative
pub const FINALIZE: StageContract = StageContract {
    name: "finalize",
    reads: &[
        Field::NarrativeDraft,
        Field::NarrativeIntro,
        Field::RedactionMap,
        Field::GateVerdict,
    ],
    writes: &[Field::FinalNarrative, Field::FinalIntro, Field::Finalization],
};

/// Contracts of the pipeline stages, in pipeline order
pub const CONTRACTS: &[StageContract] = &[
    INGEST,
    REDACT,
    DETECT,
    PLAN,
    ANALYZE,
    LOOKUP,
    DRAFT,
    GATE,
    FEEDBACK,
    FINALIZE,
];

/// Contract registered under `name`
#[must_use]
pub fn contract_for(name: &str) -> Option<&'static StageContract> {
    CONTRACTS.iter().find(|c| c.name == name)
}
