//! Amount and counterparty patterns

use super::ids;
use crate::case::{format_amount, CaseFile};
use argus_record::{Finding, Severity};

const ROUND_UNIT: f64 = 1_000.0;
const NEAR_THRESHOLD: std::ops::Range<f64> = 8_000.0..10_000.0;
const COUNTERPARTY_VOLUME: f64 = 50_000.0;

/// Round amounts, split deposits under the reporting threshold, and
/// concentrated counterparty volume
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFraud;

impl TransactionFraud {
    /// Registered name
    pub const NAME: &'static str = "transaction_fraud";
    /// Score contributed per finding
    pub const WEIGHT: f64 = 0.25;

    /// Findings over the redacted case
    #[must_use]
    pub fn findings(case: &CaseFile) -> Vec<Finding> {
        let txns = &case.transactions;
        let mut findings = Vec::new();

        let round: Vec<_> = txns
            .iter()
            .filter(|t| t.amount > 0.0 && t.amount % ROUND_UNIT == 0.0)
            .collect();
        if !round.is_empty() {
            findings.push(Finding::new(
                "round_amount_transactions",
                Severity::Medium,
                round.len(),
                format!(
                    "{} transactions with round amounts (multiples of $1,000)",
                    round.len()
                ),
                ids(round),
            ));
        }

        let near: Vec<_> = txns
            .iter()
            .filter(|t| NEAR_THRESHOLD.contains(&t.amount))
            .collect();
        if near.len() >= 2 {
            let total: f64 = near.iter().map(|t| t.amount).sum();
            findings.push(Finding::new(
                "structuring_below_ctr_threshold",
                Severity::High,
                near.len(),
                format!(
                    "{} transactions between $8,000-$10,000 totaling {}, possible structuring to avoid CTR",
                    near.len(),
                    format_amount(total)
                ),
                ids(near),
            ));
        }

        // first-seen order
        let mut volumes: Vec<(&str, f64)> = Vec::new();
        for t in txns {
            let party = t
                .to_entity
                .as_deref()
                .or(t.from_entity.as_deref())
                .unwrap_or("unknown");
            match volumes.iter_mut().find(|(p, _)| *p == party) {
                Some((_, total)) => *total += t.amount,
                None => volumes.push((party, t.amount)),
            }
        }
        for (party, total) in volumes {
            if total > COUNTERPARTY_VOLUME && party != "unknown" {
                findings.push(Finding::new(
                    "counterparty_concentration",
                    Severity::Medium,
                    1,
                    format!(
                        "High volume with single counterparty '{party}': {}",
                        format_amount(total)
                    ),
                    vec![party.to_string()],
                ));
            }
        }

        findings
    }
}

analyzer_stage!(TransactionFraud);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Transaction;

    fn txn(id: &str, amount: f64, to: Option<&str>) -> Transaction {
        Transaction {
            txn_id: id.to_string(),
            amount,
            to_entity: to.map(str::to_string),
            ..Transaction::default()
        }
    }

    #[test]
    fn structuring_pair_is_found() {
        let case = CaseFile {
            transactions: vec![txn("T1", 9500.0, None), txn("T2", 9800.0, None)],
            ..CaseFile::default()
        };
        let findings = TransactionFraud::findings(&case);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pattern, "structuring_below_ctr_threshold");
        assert!(findings[0].detail.contains("$19,300.00"));
    }

    #[test]
    fn round_amounts_and_concentration() {
        let case = CaseFile {
            transactions: vec![
                txn("T1", 30_000.0, Some("Oceanic Holdings")),
                txn("T2", 25_000.0, Some("Oceanic Holdings")),
                txn("T3", 70_000.0, None),
            ],
            ..CaseFile::default()
        };
        let patterns: Vec<String> = TransactionFraud::findings(&case)
            .into_iter()
            .map(|f| f.pattern)
            .collect();
        assert_eq!(
            patterns,
            vec!["round_amount_transactions", "counterparty_concentration"]
        );
    }
}
