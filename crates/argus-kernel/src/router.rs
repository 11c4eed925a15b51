//! Conditional edges
//!
//! A router inspects the record after its source stage and names the next
//! stage. Each router declares the stages it may choose; the graph checks
//! them at construction and the executor checks every choice at run time.

use crate::stage_name::StageName;
use argus_record::CaseRecord;
use tracing::{debug, warn};

/// Chooses the successor of a stage
pub trait Router: Send + Sync {
    /// Router name for diagnostics
    fn name(&self) -> &'static str;

    /// Stages this router may choose
    fn targets(&self) -> &'static [StageName];

    /// Choose the next stage
    fn route(&self, record: &CaseRecord) -> StageName;
}

/// After analysis: external lookup when the plan asks for it
#[derive(Debug, Clone, Copy, Default)]
pub struct IntelRouter;

impl Router for IntelRouter {
    fn name(&self) -> &'static str {
        "intel"
    }

    fn targets(&self) -> &'static [StageName] {
        &[StageName::Lookup, StageName::Draft]
    }

    fn route(&self, record: &CaseRecord) -> StageName {
        if record.plan.as_ref().is_some_and(|p| p.requires_lookup) {
            StageName::Lookup
        } else {
            StageName::Draft
        }
    }
}

/// After the gate: finalize or revise.
///
/// A passing score finalizes. A failing score finalizes anyway once the
/// revision count has reached the ceiling; otherwise the draft goes back
/// through feedback.
#[derive(Debug, Clone, Copy)]
pub struct QualityGateRouter {
    threshold: f64,
    default_ceiling: u32,
}

impl QualityGateRouter {
    /// Router passing at `threshold`. `default_ceiling` applies when the
    /// record carries no revision ceiling of its own.
    #[must_use]
    pub fn new(threshold: f64, default_ceiling: u32) -> Self {
        Self {
            threshold,
            default_ceiling,
        }
    }
}

impl Router for QualityGateRouter {
    fn name(&self) -> &'static str {
        "quality_gate"
    }

    fn targets(&self) -> &'static [StageName] {
        &[StageName::Finalize, StageName::Feedback]
    }

    fn route(&self, record: &CaseRecord) -> StageName {
        let score = record.gate_verdict.as_ref().map_or(0.0, |v| v.score);
        let revisions = record.revision_count();
        let ceiling = record.revision_ceiling.unwrap_or(self.default_ceiling);

        if score >= self.threshold {
            debug!(score, threshold = self.threshold, "gate passed");
            StageName::Finalize
        } else if revisions >= ceiling {
            warn!(
                score,
                threshold = self.threshold,
                revisions,
                ceiling,
                "revision ceiling reached, finalizing below threshold"
            );
            StageName::Finalize
        } else {
            debug!(score, revisions, ceiling, "gate failed, requesting revision");
            StageName::Feedback
        }
    }
}
