//! Revision instructions for the next draft

use crate::contract::{StageContract, FEEDBACK};
use crate::error::{require, StageError};
use crate::stage::Stage;
use argus_record::{CaseRecord, Field, GateVerdict, RecordUpdate};
use std::fmt::Write as _;
use tracing::info;

const NO_FEEDBACK: &str = "No specific feedback provided.";

/// Collate suggestions, failing checks and the reviewer note
#[must_use]
pub fn revision_instructions(verdict: &GateVerdict, reviewer_note: Option<&str>) -> String {
    let mut out = String::new();
    let failing: Vec<_> = verdict.failing_checks().collect();

    if !verdict.suggestions.is_empty() || !failing.is_empty() {
        out.push_str("Quality gate feedback:\n");
        for (i, suggestion) in verdict.suggestions.iter().enumerate() {
            let _ = writeln!(out, "  {}. {suggestion}", i + 1);
        }
        for check in failing {
            let _ = writeln!(out, "  - Fix: {}: {}", check.dimension, check.details);
        }
    }

    if let Some(note) = reviewer_note.map(str::trim).filter(|n| !n.is_empty()) {
        let _ = write!(out, "\nReviewer note:\n{note}");
    }

    let out = out.trim().to_string();
    if out.is_empty() {
        NO_FEEDBACK.to_string()
    } else {
        out
    }
}

/// Turns a failed verdict into instructions and bumps the revision count
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackStage;

#[async_trait::async_trait]
impl Stage for FeedbackStage {
    fn name(&self) -> &'static str {
        "feedback"
    }

    fn contract(&self) -> &'static StageContract {
        &FEEDBACK
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let verdict = require(self.name(), Field::GateVerdict, view.gate_verdict.as_ref())?;
        let instructions = revision_instructions(verdict, view.reviewer_note.as_deref());
        let revision_count = view.revision_count() + 1;
        info!(revision_count, score = verdict.score, "revision requested");
        Ok(RecordUpdate {
            revision_instructions: Some(instructions),
            revision_count: Some(revision_count),
            ..RecordUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_record::GateCheck;
    use pretty_assertions::assert_eq;

    fn verdict(suggestions: &[&str], failing: &[(&str, &str)]) -> GateVerdict {
        GateVerdict {
            score: 0.4,
            passed: false,
            checks: failing
                .iter()
                .map(|(dimension, details)| GateCheck {
                    dimension: (*dimension).to_string(),
                    passed: false,
                    score: 0.0,
                    details: (*details).to_string(),
                })
                .collect(),
            suggestions: suggestions.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn collates_all_sources() {
        let text = revision_instructions(
            &verdict(&["Cite dates"], &[("minimum_length", "Narrative has 40 words")]),
            Some("mention the branch"),
        );
        assert_eq!(
            text,
            "Quality gate feedback:\n  1. Cite dates\n  - Fix: minimum_length: Narrative has 40 words\n\n\
             Reviewer note:\nmention the branch"
        );
    }

    #[test]
    fn empty_verdict_has_default_text() {
        assert_eq!(revision_instructions(&verdict(&[], &[]), Some("  ")), NO_FEEDBACK);
    }

    #[tokio::test]
    async fn increments_revision_count() {
        let view = CaseRecord {
            gate_verdict: Some(verdict(&["more detail"], &[])),
            revision_count: Some(2),
            ..CaseRecord::default()
        };
        let update = FeedbackStage.run(&view).await.unwrap();
        assert_eq!(update.revision_count, Some(3));
        assert!(update.revision_instructions.unwrap().contains("more detail"));
    }

    #[tokio::test]
    async fn requires_a_verdict() {
        let err = FeedbackStage.run(&CaseRecord::default()).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::MissingInput {
                field: Field::GateVerdict,
                ..
            }
        ));
    }
}
