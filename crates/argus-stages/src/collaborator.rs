//! External collaborators
//!
//! Text generation and narrative judging are opaque to the pipeline. Stages
//! hold them as trait objects and fall back to deterministic behaviour when
//! a call fails.

use crate::case::{format_amount, CaseFile};
use crate::error::CollaboratorError;
use argus_record::{CrimeCategory, Field, RiskIndicator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What a generation call is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationRole {
    /// Produce a JSON execution plan
    Planning,
    /// Produce a sectioned narrative
    Narrative,
    /// Score a narrative, answering in JSON
    Judge,
}

impl fmt::Display for GenerationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planning => "planning",
            Self::Narrative => "narrative",
            Self::Judge => "judge",
        };
        f.write_str(s)
    }
}

/// Structured context handed to a text generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Role of the call
    pub role: GenerationRole,
    /// Case the call concerns
    pub case_id: String,
    /// Redacted context
    pub context: Value,
}

/// Structured context -> free text
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `request`
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CollaboratorError>;
}

/// Narrative handed to a judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Redacted narrative
    pub narrative: String,
    /// Classified categories
    pub categories: Vec<CrimeCategory>,
    /// Detected indicators
    pub risk_indicators: Vec<RiskIndicator>,
    /// Transactions in the case
    pub transaction_count: usize,
}

/// Judge's opinion of a narrative
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgeAssessment {
    /// Score in `[0, 1]`
    #[serde(alias = "overall_score")]
    pub score: f64,
    /// Problems found
    #[serde(default)]
    pub issues: Vec<String>,
    /// Suggested fixes
    #[serde(default, alias = "improvement_suggestions")]
    pub suggestions: Vec<String>,
}

/// Opaque narrative scorer used as a gate input
#[async_trait::async_trait]
pub trait QualityJudge: Send + Sync {
    /// Score `request`
    async fn assess(&self, request: &JudgeRequest) -> Result<JudgeAssessment, CollaboratorError>;
}

/// Judge that asks a [`TextGenerator`] in the judge role for a JSON assessment
pub struct GeneratedJudge<G> {
    generator: G,
}

impl<G: TextGenerator> GeneratedJudge<G> {
    /// Wrap a generator
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

#[async_trait::async_trait]
impl<G: TextGenerator> QualityJudge for GeneratedJudge<G> {
    async fn assess(&self, request: &JudgeRequest) -> Result<JudgeAssessment, CollaboratorError> {
        let context = serde_json::to_value(request)
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        let text = self
            .generator
            .generate(&GenerationRequest {
                role: GenerationRole::Judge,
                case_id: String::new(),
                context,
            })
            .await?;
        let mut assessment: JudgeAssessment = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        assessment.score = assessment.score.clamp(0.0, 1.0);
        Ok(assessment)
    }
}

/// Remove a surrounding markdown code fence, if any
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.rsplit_once("```").map_or(body, |(inner, _)| inner).trim()
}

/// Deterministic narrator used when no model is configured.
///
/// Writes a sectioned narrative straight from the redacted context. It
/// declines the planning and judge roles, so those stages take their rule
/// fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

#[async_trait::async_trait]
impl TextGenerator for TemplateNarrator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CollaboratorError> {
        if request.role != GenerationRole::Narrative {
            return Err(CollaboratorError::Unsupported(request.role.to_string()));
        }
        let case_value = request
            .context
            .get("case")
            .ok_or_else(|| CollaboratorError::InvalidResponse("context has no case".into()))?;
        let case = CaseFile::from_value("draft", Field::Redacted, case_value)
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        let indicators: Vec<RiskIndicator> = request
            .context
            .get("risk_indicators")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?
            .unwrap_or_default();
        let categories: Vec<CrimeCategory> = request
            .context
            .get("categories")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?
            .unwrap_or_default();
        Ok(render_template(&case, &indicators, &categories))
    }
}

fn render_template(
    case: &CaseFile,
    indicators: &[RiskIndicator],
    categories: &[CrimeCategory],
) -> String {
    let subject = case.subject.name.as_deref().unwrap_or("the subject");
    let start = case
        .transaction_summary
        .date_range
        .start
        .as_deref()
        .unwrap_or("an unknown date");
    let end = case
        .transaction_summary
        .date_range
        .end
        .as_deref()
        .unwrap_or("an unknown date");
    let activity = categories
        .first()
        .map_or("suspicious activity", |c| c.kind.as_str())
        .replace('_', " ");

    let mut out = String::new();
    out.push_str("REASONING:\n");
    out.push_str(&format!(
        "- Reviewed {} transactions between {start} and {end}\n",
        case.transactions.len()
    ));
    for indicator in indicators {
        out.push_str(&format!("- Indicator {}: {}\n", indicator.kind, indicator.description));
    }
    for category in categories {
        out.push_str(&format!(
            "- Category {} at confidence {:.2}\n",
            category.kind, category.confidence
        ));
    }

    out.push_str("\nNARRATIVE_INTRO:\n");
    out.push_str(&format!(
        "This report concerns {subject} in connection with case {} and describes activity \
         consistent with {activity} observed between {start} and {end}. The review covered \
         {} accounts and {} transactions with total inflow of {} and total outflow of {}.\n",
        case.id(),
        case.accounts.len(),
        case.transaction_summary.count,
        format_amount(case.transaction_summary.total_inflow),
        format_amount(case.transaction_summary.total_outflow),
    ));

    out.push_str("\nNARRATIVE_BODY:\n");
    for txn in &case.transactions {
        let counterparty = txn
            .to_entity
            .as_deref()
            .or(txn.from_entity.as_deref())
            .unwrap_or("an unidentified counterparty");
        out.push_str(&format!(
            "On {}, transaction {} recorded a {} of {} involving {counterparty}.",
            txn.day(),
            txn.txn_id,
            txn.kind.replace('_', " "),
            format_amount(txn.amount),
        ));
        if !txn.risk_flags.is_empty() {
            out.push_str(&format!(" It was flagged for {}.", txn.risk_flags.join(", ")));
        }
        out.push('\n');
    }
    for indicator in indicators {
        out.push_str(&format!(
            "The review identified {} with {:?} severity: {}. Supporting references: {}.\n",
            indicator.kind.replace('_', " "),
            indicator.severity,
            indicator.description,
            if indicator.evidence.is_empty() {
                "none recorded".to_string()
            } else {
                indicator.evidence.join(", ")
            }
        ));
    }

    out.push_str("\nNARRATIVE_CONCLUSION:\n");
    out.push_str(&format!(
        "Based on the transaction pattern, the indicators above and the account profile, \
         the activity of {subject} between {start} and {end} appears inconsistent with a \
         legitimate business or personal purpose and is reported for further review by the \
         appropriate authorities.\n"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_fenced_json() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}"), "{}");
    }

    #[tokio::test]
    async fn template_declines_planning() {
        let request = GenerationRequest {
            role: GenerationRole::Planning,
            case_id: "C-1".to_string(),
            context: json!({}),
        };
        let err = TemplateNarrator.generate(&request).await.unwrap_err();
        assert_eq!(err, CollaboratorError::Unsupported("planning".to_string()));
    }

    #[tokio::test]
    async fn template_writes_every_section() {
        let request = GenerationRequest {
            role: GenerationRole::Narrative,
            case_id: "C-1".to_string(),
            context: json!({
                "case": {
                    "case_id": "C-1",
                    "subject": {"name": "[NAME_000]"},
                    "transactions": [
                        {"txn_id": "TXN-1", "date": "2024-01-02", "type": "cash_deposit", "amount": 9500.0}
                    ]
                }
            }),
        };
        let text = TemplateNarrator.generate(&request).await.unwrap();
        for section in ["REASONING:", "NARRATIVE_INTRO:", "NARRATIVE_BODY:", "NARRATIVE_CONCLUSION:"] {
            assert!(text.contains(section), "missing {section}");
        }
        assert!(text.contains("[NAME_000]"));
        assert!(text.contains("TXN-1"));
        assert!(text.contains("$9,500.00"));
    }

    struct Canned(&'static str);

    #[async_trait::async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _: &GenerationRequest) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn generated_judge_parses_fenced_json() {
        let judge = GeneratedJudge::new(Canned(
            "```json\n{\"overall_score\": 1.4, \"improvement_suggestions\": [\"cite dates\"]}\n```",
        ));
        let request = JudgeRequest {
            narrative: "text".to_string(),
            categories: vec![],
            risk_indicators: vec![],
            transaction_count: 0,
        };
        let assessment = judge.assess(&request).await.unwrap();
        assert_eq!(assessment.score, 1.0);
        assert_eq!(assessment.suggestions, vec!["cite dates".to_string()]);
    }
}
