//! Quality gate: rule checks blended with an optional judge

use crate::case::{redacted_case, CaseFile};
use crate::collaborator::{JudgeRequest, QualityJudge};
use crate::contract::{StageContract, GATE};
use crate::error::{require, StageError};
use crate::stage::Stage;
use argus_record::{CaseRecord, Field, GateCheck, GateVerdict, RecordUpdate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Weight of the judge score in the blended gate score
pub const JUDGE_WEIGHT: f64 = 0.6;
/// Weight of the rule score in the blended gate score
pub const RULE_WEIGHT: f64 = 0.4;

const MIN_WORDS: usize = 100;
const TARGET_WORDS: f64 = 200.0;

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{4}-\d{2}-\d{2}\b|\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}\b",
    )
    .expect("valid date pattern")
});

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$[\d,]+\.?\d*|\b\d{1,3}(?:,\d{3})*(?:\.\d{2})?\b").expect("valid amount pattern")
});

const TIP_OFF_PHRASES: &[&str] = &[
    "we are filing a sar on you",
    "you are being investigated",
    "this report is about your suspicious",
    "we suspect you of",
];

fn check(dimension: &str, passed: bool, score: f64, details: String) -> GateCheck {
    GateCheck {
        dimension: dimension.to_string(),
        passed,
        score,
        details,
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(found: usize, target: f64) -> f64 {
    (found as f64 / target).min(1.0)
}

/// Deterministic checks over a redacted narrative
#[must_use]
pub fn rule_checks(narrative: &str, case: &CaseFile) -> Vec<GateCheck> {
    let words = narrative.split_whitespace().count();
    let dates = DATE.find_iter(narrative).count();
    let amounts = AMOUNT.find_iter(narrative).count();

    let ids: Vec<&str> = case
        .transactions
        .iter()
        .map(|t| t.txn_id.as_str())
        .filter(|id| !id.is_empty())
        .collect();
    let referenced = ids.iter().filter(|id| narrative.contains(**id)).count();
    let total = case.transactions.len().max(1);
    #[allow(clippy::cast_precision_loss)]
    let coverage = referenced as f64 / total as f64;

    let lower = narrative.to_lowercase();
    let tipped_off = TIP_OFF_PHRASES.iter().any(|p| lower.contains(p));

    vec![
        check(
            "minimum_length",
            words >= MIN_WORDS,
            ratio(words, TARGET_WORDS),
            format!("Narrative has {words} words (minimum recommended: {MIN_WORDS})"),
        ),
        check(
            "date_references",
            dates >= 1,
            ratio(dates, 3.0),
            format!("Found {dates} date reference(s) in narrative"),
        ),
        check(
            "amount_references",
            amounts >= 1,
            ratio(amounts, 5.0),
            format!("Found {amounts} amount reference(s) in narrative"),
        ),
        check(
            "transaction_references",
            referenced > 0,
            coverage,
            format!("Referenced {referenced}/{total} transactions"),
        ),
        check(
            "no_tip_off",
            !tipped_off,
            if tipped_off { 0.0 } else { 1.0 },
            if tipped_off {
                "Potential tipping-off language found".to_string()
            } else {
                "No tipping-off language detected".to_string()
            },
        ),
    ]
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Scores the draft and records the verdict
pub struct GateStage {
    threshold: f64,
    judge: Option<Arc<dyn QualityJudge>>,
}

impl GateStage {
    /// Rule checks only
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            judge: None,
        }
    }

    /// Blend rule checks with `judge`
    #[must_use]
    pub fn with_judge(mut self, judge: Arc<dyn QualityJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Pass threshold
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[async_trait::async_trait]
impl Stage for GateStage {
    fn name(&self) -> &'static str {
        "gate"
    }

    fn contract(&self) -> &'static StageContract {
        &GATE
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let narrative = require(self.name(), Field::NarrativeDraft, view.narrative_draft.as_ref())?;
        let case = redacted_case(self.name(), view)?;

        let checks = rule_checks(narrative, &case);
        #[allow(clippy::cast_precision_loss)]
        let rule_score = checks.iter().map(|c| c.score).sum::<f64>() / checks.len().max(1) as f64;

        let (judge_score, suggestions) = match &self.judge {
            Some(judge) => {
                let request = JudgeRequest {
                    narrative: narrative.clone(),
                    categories: view.categories.clone().unwrap_or_default(),
                    risk_indicators: view.risk_indicators.clone().unwrap_or_default(),
                    transaction_count: case.transactions.len(),
                };
                match judge.assess(&request).await {
                    Ok(assessment) => (assessment.score, assessment.suggestions),
                    Err(e) => {
                        warn!(case_id = case.id(), error = %e, "judge failed, using rule score");
                        (rule_score, Vec::new())
                    }
                }
            }
            None => {
                debug!(case_id = case.id(), "no judge configured, using rule score");
                (rule_score, Vec::new())
            }
        };

        let score = round3(JUDGE_WEIGHT * judge_score + RULE_WEIGHT * rule_score);
        let passed = score >= self.threshold;
        info!(
            case_id = case.id(),
            score,
            threshold = self.threshold,
            passed,
            "quality gate evaluated"
        );

        Ok(RecordUpdate {
            gate_verdict: Some(GateVerdict {
                score,
                passed,
                checks,
                suggestions: if passed { Vec::new() } else { suggestions },
            }),
            ..RecordUpdate::default()
        })
    }
}
