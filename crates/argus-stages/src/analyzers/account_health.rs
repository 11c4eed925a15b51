//! Account profile and history

use crate::case::{format_amount, CaseFile};
use argus_record::{Finding, Severity};
use std::collections::BTreeSet;

const MANY_ACCOUNTS: usize = 3;
const HIGH_BALANCE: f64 = 100_000.0;
const BURST_TXNS: usize = 10;
const BURST_DAYS: usize = 5;

/// Profile mismatch, PEP exposure, account spread, balances and dormancy bursts
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountHealth;

impl AccountHealth {
    /// Registered name
    pub const NAME: &'static str = "account_health";
    /// Score contributed per finding
    pub const WEIGHT: f64 = 0.25;

    /// Findings over the redacted case
    #[must_use]
    pub fn findings(case: &CaseFile) -> Vec<Finding> {
        let kyc = &case.kyc;
        let accounts = &case.accounts;
        let mut findings = Vec::new();

        if kyc.activity_mismatch {
            findings.push(Finding::new(
                "profile_activity_mismatch",
                Severity::High,
                1,
                format!(
                    "KYC declared activity '{}' does not match actual behavior '{}'",
                    kyc.expected_activity.as_deref().unwrap_or("none"),
                    kyc.actual_activity_profile.as_deref().unwrap_or("none"),
                ),
                vec!["activity_mismatch".to_string()],
            ));
        }

        if kyc.pep_status {
            findings.push(Finding::new(
                "pep_involvement",
                Severity::High,
                1,
                "Subject is a Politically Exposed Person (PEP), enhanced due diligence required",
                vec!["pep_status".to_string()],
            ));
        }

        let account_id =
            |a: &crate::case::Account| a.account_id.clone().unwrap_or_else(|| "unknown".to_string());

        if accounts.len() >= MANY_ACCOUNTS {
            findings.push(Finding::new(
                "multiple_accounts",
                Severity::Medium,
                accounts.len(),
                format!(
                    "Subject maintains {} accounts, possible fund distribution pattern",
                    accounts.len()
                ),
                accounts.iter().map(account_id).collect(),
            ));
        }

        for account in accounts.iter().filter(|a| a.balance > HIGH_BALANCE) {
            let id = account_id(account);
            findings.push(Finding::new(
                "high_balance",
                Severity::Medium,
                1,
                format!(
                    "Account {id} has balance {}, requires review against declared source of funds",
                    format_amount(account.balance)
                ),
                vec![id],
            ));
        }

        let days: BTreeSet<&str> = case
            .transactions
            .iter()
            .filter(|t| !t.date.is_empty())
            .map(|t| t.day())
            .collect();
        let txn_count = case.transactions.len();
        if days.len() >= 2 && days.len() <= BURST_DAYS && txn_count >= BURST_TXNS {
            findings.push(Finding::new(
                "burst_after_dormancy",
                Severity::High,
                txn_count,
                format!(
                    "{txn_count} transactions concentrated within {} days, possible previously dormant account now activated",
                    days.len()
                ),
                days.iter().map(|d| (*d).to_string()).collect(),
            ));
        }

        findings
    }
}

analyzer_stage!(AccountHealth);
