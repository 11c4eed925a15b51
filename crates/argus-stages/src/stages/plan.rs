//! Analyzer selection and routing hints

use crate::case::redacted_case;
use crate::collaborator::{strip_code_fence, GenerationRequest, GenerationRole, TextGenerator};
use crate::contract::{StageContract, PLAN};
use crate::error::{CollaboratorError, StageError};
use crate::stage::Stage;
use argus_record::{CaseRecord, ExecutionPlan, RecordUpdate, RiskIndicator};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Analyzers selected when nothing else applies
pub const DEFAULT_ANALYZERS: [&str; 3] = ["transaction_fraud", "country_risk", "account_health"];

/// Plan as a text generator phrases it
#[derive(Debug, Deserialize)]
struct GeneratedPlan {
    #[serde(default, alias = "active_typology_agents")]
    analyzers: Vec<String>,
    #[serde(default = "default_true", alias = "requires_external_intel")]
    requires_lookup: bool,
    #[serde(default)]
    narrative_focus: String,
    #[serde(default)]
    narrative_structure: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl From<GeneratedPlan> for ExecutionPlan {
    fn from(plan: GeneratedPlan) -> Self {
        Self {
            analyzers: plan.analyzers,
            requires_lookup: plan.requires_lookup,
            narrative_focus: plan.narrative_focus,
            narrative_structure: plan.narrative_structure,
        }
    }
}

/// Plan derived from indicator types alone
#[must_use]
pub fn rule_plan(indicators: &[RiskIndicator]) -> ExecutionPlan {
    let mut analyzers = BTreeSet::new();
    for indicator in indicators {
        match indicator.kind.as_str() {
            "structuring" | "layering" => {
                analyzers.extend(["transaction_fraud", "payment_velocity"]);
            }
            "high_risk_jurisdiction" => {
                analyzers.insert("country_risk");
            }
            "shell_company" => {
                analyzers.insert("account_health");
            }
            "suspicious_communication" => {
                analyzers.insert("text_content");
            }
            "velocity_anomaly" => {
                analyzers.insert("payment_velocity");
            }
            _ => {}
        }
    }
    if analyzers.is_empty() {
        analyzers.extend(DEFAULT_ANALYZERS);
    }
    ExecutionPlan {
        analyzers: analyzers.into_iter().map(str::to_string).collect(),
        requires_lookup: true,
        narrative_focus: "Comprehensive analysis of detected suspicious activity patterns"
            .to_string(),
        narrative_structure: vec![
            "Subject and account identification".to_string(),
            "Suspicious activity description".to_string(),
            "Supporting evidence and analysis".to_string(),
            "Conclusion and risk assessment".to_string(),
        ],
    }
}

/// Asks the text generator for a plan, falling back to [`rule_plan`]
pub struct PlanStage {
    generator: Arc<dyn TextGenerator>,
}

impl PlanStage {
    /// Create with a text generator
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    async fn generated_plan(
        &self,
        request: &GenerationRequest,
    ) -> Result<ExecutionPlan, CollaboratorError> {
        let text = self.generator.generate(request).await?;
        let plan: GeneratedPlan = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        Ok(plan.into())
    }
}

#[async_trait::async_trait]
impl Stage for PlanStage {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn contract(&self) -> &'static StageContract {
        &PLAN
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let case = redacted_case(self.name(), view)?;
        let indicators = view.risk_indicators.clone().unwrap_or_default();
        let categories = view.categories.clone().unwrap_or_default();

        let request = GenerationRequest {
            role: GenerationRole::Planning,
            case_id: case.id().to_string(),
            context: json!({
                "case_id": case.id(),
                "categories": categories,
                "risk_indicators": indicators,
            }),
        };

        let plan = match self.generated_plan(&request).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(case_id = case.id(), error = %e, "plan generation failed, using rule plan");
                rule_plan(&indicators)
            }
        };

        info!(
            case_id = case.id(),
            analyzers = ?plan.analyzers,
            requires_lookup = plan.requires_lookup,
            "planning complete"
        );
        Ok(RecordUpdate {
            plan: Some(plan),
            ..RecordUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::TemplateNarrator;
    use argus_record::Severity;

    struct Canned(&'static str);

    #[async_trait::async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _: &GenerationRequest) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    fn view(kinds: &[&str]) -> CaseRecord {
        CaseRecord {
            redacted: Some(json!({"case_id": "C-7"})),
            risk_indicators: Some(
                kinds
                    .iter()
                    .map(|k| RiskIndicator {
                        kind: (*k).to_string(),
                        severity: Severity::High,
                        description: String::new(),
                        evidence: vec![],
                    })
                    .collect(),
            ),
            ..CaseRecord::default()
        }
    }

    #[test]
    fn rule_plan_defaults_when_nothing_matches() {
        let plan = rule_plan(&[]);
        assert_eq!(
            plan.analyzers,
            vec!["account_health", "country_risk", "transaction_fraud"]
        );
        assert!(plan.requires_lookup);
    }

    #[tokio::test]
    async fn unsupported_generator_falls_back_to_rules() {
        let stage = PlanStage::new(Arc::new(TemplateNarrator));
        let update = stage.run(&view(&["structuring"])).await.unwrap();
        let plan = update.plan.unwrap();
        assert_eq!(plan.analyzers, vec!["payment_velocity", "transaction_fraud"]);
    }

    #[tokio::test]
    async fn generated_plan_accepts_fenced_json() {
        let stage = PlanStage::new(Arc::new(Canned(
            "```json\n{\"active_typology_agents\": [\"geo_anomaly\", \"bogus\"], \"requires_external_intel\": false}\n```",
        )));
        let plan = stage.run(&view(&[])).await.unwrap().plan.unwrap();
        assert_eq!(plan.analyzers, vec!["geo_anomaly", "bogus"]);
        assert!(!plan.requires_lookup);
    }

    #[tokio::test]
    async fn garbage_response_falls_back() {
        let stage = PlanStage::new(Arc::new(Canned("I think you should run everything")));
        let plan = stage
            .run(&view(&["high_risk_jurisdiction"]))
            .await
            .unwrap()
            .plan
            .unwrap();
        assert_eq!(plan.analyzers, vec!["country_risk"]);
    }
}
