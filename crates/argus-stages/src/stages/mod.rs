//! Pipeline stages in graph order

mod detect;
mod draft;
mod feedback;
mod finalize;
mod gate;
mod ingest;
mod lookup;
mod plan;
mod redact;

pub use detect::{
    classify, extract_indicators, DetectStage, HIGH_RISK_JURISDICTIONS, REPORTING_THRESHOLD,
    STRUCTURING_FLOOR,
};
pub use draft::{parse_sections, DraftStage, ParsedNarrative};
pub use feedback::{revision_instructions, FeedbackStage};
pub use finalize::FinalizeStage;
pub use gate::{rule_checks, GateStage, JUDGE_WEIGHT, RULE_WEIGHT};
pub use ingest::IngestStage;
pub use lookup::{LookupStage, MONITORED_JURISDICTIONS};
pub use plan::{rule_plan, PlanStage, DEFAULT_ANALYZERS};
pub use redact::RedactStage;
