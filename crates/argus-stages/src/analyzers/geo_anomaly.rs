//! Location inconsistencies

use crate::case::{format_amount, CaseFile, Transaction};
use argus_record::{Finding, Severity};
use std::collections::BTreeSet;

const CROSS_BORDER_RATIO: f64 = 0.6;
const DIVERSE_LOCATIONS: usize = 4;

/// Same-day travel, cross-border share and location spread
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoAnomaly;

impl GeoAnomaly {
    /// Registered name
    pub const NAME: &'static str = "geo_anomaly";
    /// Score contributed per finding
    pub const WEIGHT: f64 = 0.3;

    /// Findings over the redacted case
    #[must_use]
    pub fn findings(case: &CaseFile) -> Vec<Finding> {
        let txns = &case.transactions;
        let mut findings = Vec::new();

        let mut ordered: Vec<&Transaction> = txns.iter().collect();
        ordered.sort_by(|a, b| a.date.cmp(&b.date));

        for pair in ordered.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (Some(here), Some(there)) = (a.location.as_deref(), b.location.as_deref()) else {
                continue;
            };
            if !here.is_empty() && !there.is_empty() && here != there && a.day() == b.day() {
                findings.push(Finding::new(
                    "impossible_travel",
                    Severity::High,
                    1,
                    format!(
                        "Transactions from different locations on same day: '{here}' and '{there}' on {}",
                        a.day()
                    ),
                    vec![a.txn_id.clone(), b.txn_id.clone()],
                ));
            }
        }

        let mut destinations: Vec<&str> = Vec::new();
        let mut cross_border = 0.0;
        let mut domestic = 0.0;
        for t in txns {
            match t.to_country.as_deref().filter(|c| !c.is_empty()) {
                Some(code) => {
                    cross_border += t.amount;
                    if !destinations.contains(&code) {
                        destinations.push(code);
                    }
                }
                None => domestic += t.amount,
            }
        }
        if cross_border > 0.0 && domestic > 0.0 {
            let ratio = cross_border / (cross_border + domestic);
            if ratio > CROSS_BORDER_RATIO {
                findings.push(Finding::new(
                    "high_cross_border_ratio",
                    Severity::Medium,
                    1,
                    format!(
                        "Cross-border transactions represent {:.0}% of total volume ({}), unusually high for customer profile",
                        ratio * 100.0,
                        format_amount(cross_border)
                    ),
                    destinations.iter().map(|c| (*c).to_string()).collect(),
                ));
            }
        }

        let locations: BTreeSet<&str> = txns
            .iter()
            .filter_map(|t| t.location.as_deref())
            .filter(|l| !l.is_empty())
            .collect();
        if locations.len() >= DIVERSE_LOCATIONS {
            let listed: Vec<&str> = locations.iter().take(5).copied().collect();
            findings.push(Finding::new(
                "high_geographic_diversity",
                Severity::Medium,
                locations.len(),
                format!(
                    "Activity across {} distinct locations: {}",
                    locations.len(),
                    listed.join(", ")
                ),
                locations.iter().map(|l| (*l).to_string()).collect(),
            ));
        }

        findings
    }
}

analyzer_stage!(GeoAnomaly);

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: &str, date: &str, location: &str, to: Option<&str>, amount: f64) -> Transaction {
        Transaction {
            txn_id: id.to_string(),
            date: date.to_string(),
            location: Some(location.to_string()),
            to_country: to.map(str::to_string),
            amount,
            ..Transaction::default()
        }
    }

    #[test]
    fn same_day_locations_and_cross_border_share() {
        let case = CaseFile {
            transactions: vec![
                txn("T1", "2024-02-01T09:00", "Miami", None, 1_000.0),
                txn("T2", "2024-02-01T15:00", "Houston", Some("KY"), 9_000.0),
            ],
            ..CaseFile::default()
        };
        let findings = GeoAnomaly::findings(&case);
        let patterns: Vec<&str> = findings.iter().map(|f| f.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["impossible_travel", "high_cross_border_ratio"]);
        assert_eq!(findings[0].evidence, vec!["T1", "T2"]);
        assert!(findings[1].detail.starts_with("Cross-border transactions represent 90%"));
    }

    #[test]
    fn wide_spread_is_reported() {
        let case = CaseFile {
            transactions: ["A", "B", "C", "D"]
                .iter()
                .enumerate()
                .map(|(i, l)| txn(&format!("T{i}"), &format!("2024-02-0{}", i + 1), l, None, 10.0))
                .collect(),
            ..CaseFile::default()
        };
        let findings = GeoAnomaly::findings(&case);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pattern, "high_geographic_diversity");
        assert_eq!(findings[0].count, 4);
    }
}
