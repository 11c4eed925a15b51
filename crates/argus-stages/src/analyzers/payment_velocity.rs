//! Transaction frequency

use super::ids;
use crate::case::{format_amount, CaseFile, Transaction};
use argus_record::{Finding, Severity};
use std::collections::BTreeMap;

const BUSY_DAY: usize = 3;
const VERY_BUSY_DAY: usize = 5;
const BURST_LEN: usize = 3;

/// Busy days, same-type bursts and elevated average velocity
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentVelocity;

impl PaymentVelocity {
    /// Registered name
    pub const NAME: &'static str = "payment_velocity";
    /// Score contributed per finding
    pub const WEIGHT: f64 = 0.3;

    /// Findings over the redacted case
    #[must_use]
    pub fn findings(case: &CaseFile) -> Vec<Finding> {
        let txns = &case.transactions;
        let mut findings = Vec::new();

        let mut daily: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for t in txns.iter().filter(|t| !t.date.is_empty()) {
            daily.entry(t.day()).or_default().push(t);
        }

        for (day, on_day) in &daily {
            if on_day.len() >= BUSY_DAY {
                let total: f64 = on_day.iter().map(|t| t.amount).sum();
                findings.push(Finding::new(
                    "high_daily_frequency",
                    if on_day.len() >= VERY_BUSY_DAY {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    on_day.len(),
                    format!(
                        "{} transactions on {day} totaling {}, above normal daily threshold",
                        on_day.len(),
                        format_amount(total)
                    ),
                    ids(on_day.iter().copied()),
                ));
            }
        }

        let mut ordered: Vec<&Transaction> = txns.iter().collect();
        ordered.sort_by(|a, b| a.date.cmp(&b.date));
        let burst = ordered.windows(BURST_LEN).find(|w| {
            w.iter()
                .all(|t| t.kind == w[0].kind && t.day() == w[0].day())
        });
        if let Some(window) = burst {
            findings.push(Finding::new(
                "burst_activity",
                Severity::Medium,
                BURST_LEN,
                format!(
                    "Burst of 3+ same-type '{}' transactions on {}",
                    window[0].kind,
                    window[0].day()
                ),
                ids(window.iter().copied()),
            ));
        }

        if !daily.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let average = txns.len() as f64 / daily.len() as f64;
            if average >= 3.0 {
                findings.push(Finding::new(
                    "elevated_average_velocity",
                    Severity::Medium,
                    txns.len(),
                    format!(
                        "Average {average:.1} transactions/day over {} active days",
                        daily.len()
                    ),
                    Vec::new(),
                ));
            }
        }

        findings
    }
}

analyzer_stage!(PaymentVelocity);

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: &str, date: &str, kind: &str) -> Transaction {
        Transaction {
            txn_id: id.to_string(),
            date: date.to_string(),
            kind: kind.to_string(),
            amount: 100.0,
            ..Transaction::default()
        }
    }

    #[test]
    fn busy_day_burst_and_average() {
        let case = CaseFile {
            transactions: vec![
                txn("T1", "2024-01-02T09:00", "cash_deposit"),
                txn("T2", "2024-01-02T10:00", "cash_deposit"),
                txn("T3", "2024-01-02T11:00", "cash_deposit"),
            ],
            ..CaseFile::default()
        };
        let findings = PaymentVelocity::findings(&case);
        let patterns: Vec<&str> = findings.iter().map(|f| f.pattern.as_str()).collect();
        assert_eq!(
            patterns,
            vec!["high_daily_frequency", "burst_activity", "elevated_average_velocity"]
        );
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[1].evidence, vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn spread_out_activity_is_quiet() {
        let case = CaseFile {
            transactions: vec![
                txn("T1", "2024-01-02", "wire"),
                txn("T2", "2024-01-03", "wire"),
                txn("T3", "2024-01-04", "wire"),
            ],
            ..CaseFile::default()
        };
        assert!(PaymentVelocity::findings(&case).is_empty());
    }
}
