//! Reverse redaction of the accepted narrative

use crate::contract::{StageContract, FINALIZE};
use crate::error::{require, StageError};
use crate::stage::Stage;
use argus_record::{CaseRecord, Field, Finalization, RecordUpdate, RedactionMap};
use argus_redaction::{unmask, unmask_strict};
use tracing::{info, warn};

fn restore(stage: &str, text: &str, mapping: &RedactionMap) -> String {
    unmask_strict(text, mapping).unwrap_or_else(|e| {
        warn!(stage, error = %e, "narrative keeps unresolved placeholders");
        unmask(text, mapping)
    })
}

/// Restores original values and records why the loop ended
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalizeStage;

#[async_trait::async_trait]
impl Stage for FinalizeStage {
    fn name(&self) -> &'static str {
        "finalize"
    }

    fn contract(&self) -> &'static StageContract {
        &FINALIZE
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let draft = require(self.name(), Field::NarrativeDraft, view.narrative_draft.as_ref())?;
        let mapping = require(self.name(), Field::RedactionMap, view.redaction_map.as_ref())?;

        let final_narrative = restore(self.name(), draft, mapping);
        let final_intro = view
            .narrative_intro
            .as_deref()
            .map(|intro| restore(self.name(), intro, mapping))
            .unwrap_or_default();

        let finalization = match &view.gate_verdict {
            Some(verdict) if verdict.passed => Finalization::GatePassed,
            verdict => {
                warn!(
                    score = verdict.as_ref().map(|v| v.score),
                    "finalizing below the quality threshold"
                );
                Finalization::RevisionCeilingReached
            }
        };

        info!(?finalization, chars = final_narrative.len(), "narrative finalized");
        Ok(RecordUpdate {
            final_narrative: Some(final_narrative),
            final_intro: Some(final_intro),
            finalization: Some(finalization),
            ..RecordUpdate::default()
        })
    }
}
