//! Rule-based risk indicator extraction and category scoring

use crate::case::{redacted_case, CaseFile};
use crate::contract::{StageContract, DETECT};
use crate::error::StageError;
use crate::stage::Stage;
use argus_record::{CaseRecord, CrimeCategory, RecordUpdate, RiskIndicator, Severity};
use std::collections::BTreeSet;
use tracing::info;

/// Lower bound of the band just under the currency reporting threshold
pub const STRUCTURING_FLOOR: f64 = 9_000.0;
/// Currency transaction reporting threshold
pub const REPORTING_THRESHOLD: f64 = 10_000.0;

const LAYERING_FLAGS: &[&str] = &["layering_pattern", "rapid_movement", "internal_transfer"];
const SHELL_FLAGS: &[&str] = &[
    "shell_company_indicator",
    "no_verifiable_operations",
    "minimal_history",
];
const VELOCITY_FLAGS: &[&str] = &["rapid_succession", "high_frequency", "burst_activity"];

/// Jurisdictions treated as high risk
pub const HIGH_RISK_JURISDICTIONS: &[&str] = &["AF", "MM", "KP", "IR", "SY", "BZ", "PA", "VU", "KY"];

/// Minimum summed weight for a category to be reported
const CATEGORY_FLOOR: f64 = 0.15;
const CONFIDENCE_CAP: f64 = 0.99;

/// Category -> (indicator type, weight)
const SCORING_RULES: &[(&str, &[(&str, f64)])] = &[
    (
        "structuring",
        &[
            ("structuring", 0.45),
            ("velocity_anomaly", 0.15),
            ("kyc_mismatch", 0.10),
        ],
    ),
    (
        "money_laundering_layering",
        &[
            ("layering", 0.40),
            ("shell_company", 0.20),
            ("high_risk_jurisdiction", 0.20),
            ("structuring", 0.10),
        ],
    ),
    (
        "shell_company_activity",
        &[
            ("shell_company", 0.40),
            ("high_risk_jurisdiction", 0.25),
            ("layering", 0.10),
        ],
    ),
    (
        "fraud",
        &[
            ("suspicious_communication", 0.30),
            ("kyc_mismatch", 0.20),
            ("adverse_media", 0.20),
        ],
    ),
];

fn indicator(
    kind: &str,
    severity: Severity,
    description: impl Into<String>,
    evidence: Vec<String>,
) -> RiskIndicator {
    RiskIndicator {
        kind: kind.to_string(),
        severity,
        description: description.into(),
        evidence,
    }
}

fn flagged(case: &CaseFile, keywords: &[&str]) -> Vec<String> {
    case.transactions
        .iter()
        .flat_map(|t| t.risk_flags.iter())
        .filter(|f| keywords.contains(&f.as_str()))
        .cloned()
        .collect()
}

/// Extract indicators from a redacted case
#[must_use]
pub fn extract_indicators(case: &CaseFile) -> Vec<RiskIndicator> {
    let mut indicators = Vec::new();

    let near_threshold: Vec<String> = case
        .transactions
        .iter()
        .filter(|t| (STRUCTURING_FLOOR..REPORTING_THRESHOLD).contains(&t.amount))
        .map(|t| t.txn_id.clone())
        .collect();
    if near_threshold.len() >= 2 {
        indicators.push(indicator(
            "structuring",
            Severity::High,
            format!(
                "{} transactions between $9,000 and $10,000 detected, potential structuring \
                 to avoid currency transaction reporting",
                near_threshold.len()
            ),
            near_threshold,
        ));
    }

    let layering = flagged(case, LAYERING_FLAGS);
    if !layering.is_empty() {
        indicators.push(indicator(
            "layering",
            Severity::High,
            "Transaction patterns consistent with layering: rapid internal transfers obscuring the origin of funds",
            layering,
        ));
    }

    let shell = flagged(case, SHELL_FLAGS);
    if !shell.is_empty() {
        indicators.push(indicator(
            "shell_company",
            Severity::Medium,
            "Transactions involving entities with shell company characteristics",
            shell,
        ));
    }

    let velocity = flagged(case, VELOCITY_FLAGS);
    if !velocity.is_empty() {
        indicators.push(indicator(
            "velocity_anomaly",
            Severity::Medium,
            "Abnormal transaction velocity detected within a short time window",
            velocity,
        ));
    }

    let risky: BTreeSet<&str> = case
        .countries()
        .into_iter()
        .filter(|c| HIGH_RISK_JURISDICTIONS.contains(c))
        .collect();
    if !risky.is_empty() {
        let codes: Vec<String> = risky.iter().map(|c| (*c).to_string()).collect();
        indicators.push(indicator(
            "high_risk_jurisdiction",
            Severity::High,
            format!("Transactions linked to high-risk jurisdictions: {}", codes.join(", ")),
            codes,
        ));
    }

    let kyc = &case.kyc;
    if kyc.activity_mismatch {
        indicators.push(indicator(
            "kyc_mismatch",
            Severity::Medium,
            format!(
                "Activity profile mismatch: expected '{}' but actual is '{}'",
                kyc.expected_activity.as_deref().unwrap_or("none"),
                kyc.actual_activity_profile.as_deref().unwrap_or("none"),
            ),
            vec!["activity_mismatch".to_string()],
        ));
    }

    if kyc.adverse_media_count > 0 {
        indicators.push(indicator(
            "adverse_media",
            Severity::Medium,
            format!(
                "{} adverse media hit(s) found for subject",
                kyc.adverse_media_count
            ),
            kyc.adverse_media_hits
                .iter()
                .map(|h| h.source.clone().unwrap_or_default())
                .collect(),
        ));
    }

    if !case.flagged_communications.is_empty() {
        let reasons: Vec<String> = case
            .flagged_communications
            .iter()
            .map(|c| c.flag_reason.clone().unwrap_or_else(|| "unknown".to_string()))
            .collect();
        indicators.push(indicator(
            "suspicious_communication",
            Severity::Medium,
            format!("Flagged communications detected: {}", reasons.join(", ")),
            reasons,
        ));
    }

    indicators
}

/// Score categories from indicator types, highest confidence first
#[must_use]
pub fn classify(indicators: &[RiskIndicator]) -> Vec<CrimeCategory> {
    let present: BTreeSet<&str> = indicators.iter().map(|i| i.kind.as_str()).collect();
    let mut categories: Vec<CrimeCategory> = SCORING_RULES
        .iter()
        .filter_map(|(category, rules)| {
            let evidence: Vec<String> = rules
                .iter()
                .filter(|(kind, _)| present.contains(kind))
                .map(|(kind, _)| (*kind).to_string())
                .collect();
            let score: f64 = rules
                .iter()
                .filter(|(kind, _)| present.contains(kind))
                .map(|(_, weight)| weight)
                .sum();
            (score > CATEGORY_FLOOR).then(|| CrimeCategory {
                kind: (*category).to_string(),
                confidence: (score.min(CONFIDENCE_CAP) * 100.0).round() / 100.0,
                evidence,
            })
        })
        .collect();
    categories.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    categories
}

/// Detects risk indicators and classifies categories
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectStage;

#[async_trait::async_trait]
impl Stage for DetectStage {
    fn name(&self) -> &'static str {
        "detect"
    }

    fn contract(&self) -> &'static StageContract {
        &DETECT
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let case = redacted_case(self.name(), view)?;
        let indicators = extract_indicators(&case);
        let categories = classify(&indicators);
        info!(
            case_id = case.id(),
            indicators = indicators.len(),
            categories = categories.len(),
            "detection complete"
        );
        Ok(RecordUpdate {
            risk_indicators: Some(indicators),
            categories: Some(categories),
            ..RecordUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Transaction;
    use pretty_assertions::assert_eq;

    fn txn(id: &str, amount: f64) -> Transaction {
        Transaction {
            txn_id: id.to_string(),
            amount,
            ..Transaction::default()
        }
    }

    #[test]
    fn two_amounts_under_threshold_are_structuring() {
        let case = CaseFile {
            transactions: vec![txn("T1", 9500.0), txn("T2", 9800.0), txn("T3", 10_000.0)],
            ..CaseFile::default()
        };
        let indicators = extract_indicators(&case);
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].kind, "structuring");
        assert_eq!(indicators[0].evidence, vec!["T1", "T2"]);

        let categories = classify(&indicators);
        let kinds: Vec<(&str, f64)> = categories
            .iter()
            .map(|c| (c.kind.as_str(), c.confidence))
            .collect();
        assert_eq!(kinds, vec![("structuring", 0.45)]);
    }

    #[test]
    fn single_near_threshold_amount_is_not_structuring() {
        let case = CaseFile {
            transactions: vec![txn("T1", 9500.0), txn("T2", 8999.99)],
            ..CaseFile::default()
        };
        assert!(extract_indicators(&case).is_empty());
    }

    #[test]
    fn categories_are_capped_and_sorted() {
        let kinds = [
            "layering",
            "shell_company",
            "high_risk_jurisdiction",
            "structuring",
            "velocity_anomaly",
        ];
        let indicators: Vec<RiskIndicator> = kinds
            .iter()
            .map(|k| indicator(k, Severity::High, "", vec![]))
            .collect();
        let categories = classify(&indicators);
        assert_eq!(categories[0].kind, "money_laundering_layering");
        assert_eq!(categories[0].confidence, 0.9);
        assert_eq!(categories[1].kind, "shell_company_activity");
        assert_eq!(categories[1].confidence, 0.75);
        assert!(categories
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn jurisdictions_and_flags_become_indicators() {
        let mut t = txn("T1", 100.0);
        t.to_country = Some("KY".to_string());
        t.from_country = Some("US".to_string());
        t.risk_flags = vec!["rapid_movement".to_string(), "burst_activity".to_string()];
        let case = CaseFile {
            transactions: vec![t],
            ..CaseFile::default()
        };
        let kinds: Vec<String> = extract_indicators(&case)
            .into_iter()
            .map(|i| i.kind)
            .collect();
        assert_eq!(kinds, vec!["layering", "velocity_anomaly", "high_risk_jurisdiction"]);
    }
}
