//! Fan-in summary

use argus_record::{AggregateSummary, AnalyzerReport};
use std::collections::BTreeMap;

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Summarize merged reports.
///
/// Empty entries count as absent. Findings are counted only for entries
/// exposing a list, and a missing score counts as zero toward the mean.
/// Failed analyzers are listed but never enter a denominator.
#[must_use]
pub fn aggregate(reports: &BTreeMap<String, AnalyzerReport>, failed: &[String]) -> AggregateSummary {
    let counted: Vec<(&String, &AnalyzerReport)> =
        reports.iter().filter(|(_, r)| !r.is_empty()).collect();

    let total_findings = counted
        .iter()
        .filter_map(|(_, r)| r.findings.as_ref())
        .map(Vec::len)
        .sum();

    let average_risk_score = if counted.is_empty() {
        0.0
    } else {
        let sum: f64 = counted.iter().map(|(_, r)| r.risk_score.unwrap_or(0.0)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / counted.len() as f64;
        round3(mean)
    };

    let mut failed_agents = failed.to_vec();
    failed_agents.sort();
    failed_agents.dedup();

    AggregateSummary {
        agents_run: counted.iter().map(|(name, _)| (*name).clone()).collect(),
        total_findings,
        average_risk_score,
        failed_agents,
    }
}
