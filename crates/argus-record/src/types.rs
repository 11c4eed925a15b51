//! Typed payloads carried by analysis, planning, gate and output fields

use serde::{Deserialize, Serialize};

/// Severity attached to indicators and findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Low,
    /// Worth reviewing
    Medium,
    /// Strong signal
    High,
    /// Sanctioned or blacklisted exposure
    Critical,
}

/// Risk pattern detected in the redacted case data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskIndicator {
    /// Indicator type, e.g. `structuring`
    #[serde(rename = "type")]
    pub kind: String,
    /// Severity
    pub severity: Severity,
    /// Human-readable description
    pub description: String,
    /// Supporting identifiers
    pub evidence: Vec<String>,
}

/// Classified category with a confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeCategory {
    /// Category name
    #[serde(rename = "type")]
    pub kind: String,
    /// Confidence in `[0, 0.99]`
    pub confidence: f64,
    /// Indicator types that contributed
    pub evidence: Vec<String>,
}

/// Planning output: which analyzers to run and routing hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Analyzer names selected to run
    #[serde(default)]
    pub analyzers: Vec<String>,
    /// Whether the external lookup stage should run
    #[serde(default)]
    pub requires_lookup: bool,
    /// What the narrative should emphasise
    #[serde(default)]
    pub narrative_focus: String,
    /// Section outline for the narrative
    #[serde(default)]
    pub narrative_structure: Vec<String>,
}

/// Single analyzer finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Pattern name
    pub pattern: String,
    /// Severity
    pub severity: Severity,
    /// Occurrences behind the finding
    pub count: usize,
    /// Description
    pub detail: String,
    /// Supporting identifiers
    pub evidence: Vec<String>,
}

impl Finding {
    /// Create a finding
    #[must_use]
    pub fn new(
        pattern: impl Into<String>,
        severity: Severity,
        count: usize,
        detail: impl Into<String>,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            severity,
            count,
            detail: detail.into(),
            evidence,
        }
    }
}

/// One analyzer's output, stored under its own key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerReport {
    /// Findings list, if the analyzer exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<Vec<Finding>>,
    /// Analyzer risk score in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
}

impl AnalyzerReport {
    /// Report with findings and a score of `min(findings * weight, 1.0)`
    #[must_use]
    pub fn scored(findings: Vec<Finding>, weight: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let score = (findings.len() as f64 * weight).min(1.0);
        Self {
            findings: Some(findings),
            risk_score: Some(score),
        }
    }

    /// Present but carrying neither findings nor a score
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_none() && self.risk_score.is_none()
    }
}

/// Fan-in summary over all analyzer reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    /// Analyzers that produced a non-empty report, sorted
    pub agents_run: Vec<String>,
    /// Findings across analyzers exposing a findings list
    pub total_findings: usize,
    /// Mean analyzer risk score, 3 decimals
    pub average_risk_score: f64,
    /// Dispatched analyzers that failed, sorted
    #[serde(default)]
    pub failed_agents: Vec<String>,
}

impl AggregateSummary {
    /// Number of analyzers counted in the summary
    #[inline]
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents_run.len()
    }
}

/// External lookup hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    /// Source of the intelligence
    pub source: String,
    /// Entity concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// What was found
    pub finding: String,
    /// Jurisdiction, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    /// Date of the hit, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Relevance label
    pub relevance: String,
}

/// Itemized quality-gate check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    /// Check dimension
    pub dimension: String,
    /// Whether the check passed
    pub passed: bool,
    /// Score in `[0, 1]`
    pub score: f64,
    /// Explanation
    pub details: String,
}

/// Quality-gate verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Combined score, 3 decimals
    pub score: f64,
    /// `score >= threshold`
    pub passed: bool,
    /// Itemized checks
    pub checks: Vec<GateCheck>,
    /// Suggested fixes, empty when passed
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl GateVerdict {
    /// Checks that did not pass
    pub fn failing_checks(&self) -> impl Iterator<Item = &GateCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// How the terminal stage was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finalization {
    /// Quality gate passed
    GatePassed,
    /// Revision ceiling reached with the gate still failing
    RevisionCeilingReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scored_report_caps_at_one() {
        let findings = (0..5)
            .map(|i| Finding::new(format!("p{i}"), Severity::Medium, 1, "d", vec![]))
            .collect();
        let report = AnalyzerReport::scored(findings, 0.35);
        assert_eq!(report.risk_score, Some(1.0));
        assert!(!report.is_empty());
    }

    #[test]
    fn default_report_is_empty() {
        assert!(AnalyzerReport::default().is_empty());
        let zero = AnalyzerReport::scored(vec![], 0.3);
        assert!(!zero.is_empty());
        assert_eq!(zero.risk_score, Some(0.0));
    }

    #[test]
    fn indicator_serializes_type_key() {
        let ind = RiskIndicator {
            kind: "structuring".to_string(),
            severity: Severity::High,
            description: "d".to_string(),
            evidence: vec![],
        };
        let json = serde_json::to_value(&ind).unwrap();
        assert_eq!(json["type"], "structuring");
        assert_eq!(json["severity"], "high");
    }

    #[test]
    fn failing_checks_filters_passed() {
        let verdict = GateVerdict {
            score: 0.5,
            passed: false,
            checks: vec![
                GateCheck {
                    dimension: "a".into(),
                    passed: true,
                    score: 1.0,
                    details: String::new(),
                },
                GateCheck {
                    dimension: "b".into(),
                    passed: false,
                    score: 0.0,
                    details: String::new(),
                },
            ],
            suggestions: vec![],
        };
        let failing: Vec<_> = verdict.failing_checks().map(|c| c.dimension.as_str()).collect();
        assert_eq!(failing, vec!["b"]);
    }
}
