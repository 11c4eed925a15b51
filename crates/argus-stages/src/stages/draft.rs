//! Narrative drafting

use crate::case::redacted_case;
use crate::collaborator::{GenerationRequest, GenerationRole, TextGenerator};
use crate::contract::{StageContract, DRAFT};
use crate::error::StageError;
use crate::stage::Stage;
use argus_record::{CaseRecord, RecordUpdate};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const DEGRADED_DRAFT: &str = "Error: narrative generation failed. Please retry.";

/// Sections of a generated narrative
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedNarrative {
    /// Reasoning steps, bullet markers stripped
    pub reasoning: Vec<String>,
    /// Introductory paragraph
    pub intro: String,
    /// Body followed by the conclusion
    pub body: String,
}

impl ParsedNarrative {
    /// Intro and body joined into the full draft
    #[must_use]
    pub fn draft(&self) -> String {
        if self.intro.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n\n{}", self.intro, self.body)
        }
    }
}

/// Split generator output on its section markers.
///
/// Text without a `NARRATIVE_INTRO:` marker is taken whole as the body.
#[must_use]
pub fn parse_sections(content: &str) -> ParsedNarrative {
    let Some((head, rest)) = content.split_once("NARRATIVE_INTRO:") else {
        return ParsedNarrative {
            body: content.trim().to_string(),
            ..ParsedNarrative::default()
        };
    };

    let reasoning = head
        .split_once("REASONING:")
        .map(|(_, steps)| {
            steps
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| l.trim_start_matches(['-', ' ']).to_string())
                .collect()
        })
        .unwrap_or_default();

    let (intro, body) = match rest.split_once("NARRATIVE_BODY:") {
        Some((intro, remainder)) => {
            let body = match remainder.split_once("NARRATIVE_CONCLUSION:") {
                Some((body, conclusion)) => format!("{}\n\n{}", body.trim(), conclusion.trim()),
                None => remainder.trim().to_string(),
            };
            (intro.trim().to_string(), body)
        }
        None => (rest.trim().to_string(), String::new()),
    };

    ParsedNarrative {
        reasoning,
        intro,
        body,
    }
}

/// Drafts the narrative from the redacted case and analysis results
pub struct DraftStage {
    generator: Arc<dyn TextGenerator>,
}

impl DraftStage {
    /// Create with a text generator
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait::async_trait]
impl Stage for DraftStage {
    fn name(&self) -> &'static str {
        "draft"
    }

    fn contract(&self) -> &'static StageContract {
        &DRAFT
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let case = redacted_case(self.name(), view)?;
        let iteration = view.revision_count();
        info!(case_id = case.id(), iteration, "drafting narrative");

        let plan = view.plan.clone().unwrap_or_default();
        let request = GenerationRequest {
            role: GenerationRole::Narrative,
            case_id: case.id().to_string(),
            context: json!({
                "case": case,
                "risk_indicators": view.risk_indicators,
                "categories": view.categories,
                "analyzer_reports": view.analyzer_reports,
                "analysis_summary": view.analysis_summary,
                "lookup_results": view.lookup_results,
                "narrative_focus": plan.narrative_focus,
                "narrative_structure": plan.narrative_structure,
                "revision": {
                    "iteration": iteration,
                    "instructions": view.revision_instructions,
                    "reviewer_note": view.reviewer_note,
                },
            }),
        };

        let (narrative_draft, intro, reasoning) = match self.generator.generate(&request).await {
            Ok(text) => {
                let parsed = parse_sections(&text);
                (parsed.draft(), parsed.intro, parsed.reasoning)
            }
            Err(e) => {
                warn!(case_id = case.id(), error = %e, "narrative generation failed, returning degraded draft");
                (
                    DEGRADED_DRAFT.to_string(),
                    DEGRADED_DRAFT.to_string(),
                    vec![format!("Error during generation: {e}")],
                )
            }
        };

        info!(case_id = case.id(), chars = narrative_draft.len(), "draft complete");
        Ok(RecordUpdate {
            narrative_draft: Some(narrative_draft),
            narrative_intro: Some(intro),
            reasoning_trace: Some(reasoning),
            ..RecordUpdate::default()
        })
    }
}
