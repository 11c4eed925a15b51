//! Alert and dispute history

use crate::case::{Alert, CaseFile};
use argus_record::{Finding, Severity};
use std::collections::{BTreeMap, BTreeSet};

const SEVERE_ALERTS: usize = 2;
const DIVERSE_TYPES: usize = 3;
const REPEATED_TYPE: usize = 3;

fn alert_id(alert: &Alert) -> String {
    alert.alert_id.clone().unwrap_or_else(|| "unknown".to_string())
}

/// Severe, varied and repeated monitoring alerts
#[derive(Debug, Clone, Copy, Default)]
pub struct DisputePattern;

impl DisputePattern {
    /// Registered name
    pub const NAME: &'static str = "dispute_pattern";
    /// Score contributed per finding
    pub const WEIGHT: f64 = 0.3;

    /// Findings over the redacted case
    #[must_use]
    pub fn findings(case: &CaseFile) -> Vec<Finding> {
        let alerts = &case.alerts;
        let mut findings = Vec::new();

        let severe: Vec<String> = alerts
            .iter()
            .filter(|a| matches!(a.severity.as_deref(), Some("high" | "critical")))
            .map(alert_id)
            .collect();
        if severe.len() >= SEVERE_ALERTS {
            findings.push(Finding::new(
                "multiple_high_severity_alerts",
                Severity::High,
                severe.len(),
                format!(
                    "{} high/critical severity alerts triggered, indicates systemic suspicious activity",
                    severe.len()
                ),
                severe,
            ));
        }

        let kinds: BTreeSet<&str> = alerts
            .iter()
            .map(|a| a.kind.as_deref().unwrap_or_default())
            .collect();
        if kinds.len() >= DIVERSE_TYPES {
            let listed: Vec<String> = kinds.iter().map(|k| (*k).to_string()).collect();
            findings.push(Finding::new(
                "diverse_alert_types",
                Severity::Medium,
                kinds.len(),
                format!(
                    "Alerts across {} different categories: {}, multi-faceted suspicious activity",
                    kinds.len(),
                    listed.join(", ")
                ),
                listed,
            ));
        }

        let mut by_kind: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for alert in alerts {
            by_kind
                .entry(alert.kind.as_deref().unwrap_or("unknown"))
                .or_default()
                .push(alert_id(alert));
        }
        for (kind, ids) in by_kind {
            if ids.len() >= REPEATED_TYPE {
                findings.push(Finding::new(
                    "repeated_alert_type",
                    Severity::High,
                    ids.len(),
                    format!("Alert type '{kind}' triggered {} times, persistent pattern", ids.len()),
                    ids,
                ));
            }
        }

        findings
    }
}

analyzer_stage!(DisputePattern);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alert(id: &str, kind: &str, severity: &str) -> Alert {
        Alert {
            alert_id: Some(id.to_string()),
            kind: Some(kind.to_string()),
            severity: Some(severity.to_string()),
            ..Alert::default()
        }
    }

    #[test]
    fn severe_and_repeated_alerts() {
        let case = CaseFile {
            alerts: vec![
                alert("A1", "structuring", "high"),
                alert("A2", "structuring", "critical"),
                alert("A3", "structuring", "low"),
            ],
            ..CaseFile::default()
        };
        let findings = DisputePattern::findings(&case);
        let patterns: Vec<&str> = findings.iter().map(|f| f.pattern.as_str()).collect();
        assert_eq!(
            patterns,
            vec!["multiple_high_severity_alerts", "repeated_alert_type"]
        );
        assert_eq!(findings[0].evidence, vec!["A1", "A2"]);
        assert_eq!(findings[1].count, 3);
    }

    #[test]
    fn varied_alert_types() {
        let case = CaseFile {
            alerts: vec![
                alert("A1", "velocity", "low"),
                alert("A2", "geo", "low"),
                alert("A3", "structuring", "medium"),
            ],
            ..CaseFile::default()
        };
        let findings = DisputePattern::findings(&case);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].evidence, vec!["geo", "structuring", "velocity"]);
    }
}
