//! Structured case view
//!
//! The shape of the `derived` field. The redacted view has the same shape
//! with sensitive leaves replaced, so stages downstream of redaction parse
//! it with the same types.

use crate::error::{require, StageError};
use argus_record::{CaseRecord, Field};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseFile {
    /// Case identifier
    pub case_id: Option<String>,
    /// Date the alert was raised
    pub alert_date: Option<String>,
    /// Investigation priority
    pub priority: Option<String>,
    /// Subject profile
    pub subject: Subject,
    /// Subject accounts
    pub accounts: Vec<Account>,
    /// Transaction timeline
    pub transactions: Vec<Transaction>,
    /// Totals over the timeline
    pub transaction_summary: TransactionSummary,
    /// Know-your-customer assessment
    pub kyc: Kyc,
    /// Communications flagged for review
    pub flagged_communications: Vec<FlaggedCommunication>,
    /// Monitoring alerts
    pub alerts: Vec<Alert>,
    /// Counterparties and affiliates
    pub related_entities: Vec<RelatedEntity>,
}

/// Subject profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Subject {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub ssn: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub occupation: Option<String>,
    pub risk_rating: Option<String>,
    pub customer_since: Option<String>,
}

/// Account held by the subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Account {
    pub account_id: Option<String>,
    pub account_type: Option<String>,
    pub balance: f64,
    pub currency: Option<String>,
    pub branch: Option<String>,
}

/// Single transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Transaction {
    pub txn_id: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub currency: Option<String>,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub from_entity: Option<String>,
    pub to_entity: Option<String>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub risk_flags: Vec<String>,
}

impl Transaction {
    /// Calendar day (`YYYY-MM-DD` prefix of the date)
    #[must_use]
    pub fn day(&self) -> &str {
        self.date.get(..10).unwrap_or(self.date.as_str())
    }

    /// Origin and destination country codes that are set
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.from_country
            .iter()
            .chain(self.to_country.iter())
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }
}

/// Totals over the transaction timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct TransactionSummary {
    pub count: usize,
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub date_range: DateRange,
    pub unique_risk_flags: Vec<String>,
}

/// First and last transaction date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Know-your-customer assessment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Kyc {
    pub verification_status: Option<String>,
    pub source_of_funds: Option<String>,
    pub expected_activity: Option<String>,
    pub actual_activity_profile: Option<String>,
    pub pep_status: bool,
    pub adverse_media_count: usize,
    pub adverse_media_hits: Vec<MediaHit>,
    pub activity_mismatch: bool,
}

/// Adverse media hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct MediaHit {
    pub source: Option<String>,
    pub summary: Option<String>,
    pub date: Option<String>,
}

/// Communication flagged for review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct FlaggedCommunication {
    pub date: Option<String>,
    pub channel: Option<String>,
    pub content_snippet: String,
    pub flag_reason: Option<String>,
}

/// Monitoring alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Alert {
    pub alert_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub triggered_date: Option<String>,
}

/// Counterparty or affiliate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct RelatedEntity {
    pub entity_name: Option<String>,
    pub entity_type: Option<String>,
    pub jurisdiction: Option<String>,
    pub relationship: Option<String>,
    pub risk_notes: Option<String>,
}

impl CaseFile {
    /// Parse a case view held in `field`
    pub fn from_value(stage: &'static str, field: Field, value: &Value) -> Result<Self, StageError> {
        serde_json::from_value(value.clone()).map_err(|e| StageError::MalformedInput {
            stage,
            field,
            reason: e.to_string(),
        })
    }

    /// Serialize back to a JSON value
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Distinct country codes touched by any transaction, in first-seen order
    #[must_use]
    pub fn countries(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for code in self.transactions.iter().flat_map(Transaction::countries) {
            if !seen.contains(&code) {
                seen.push(code);
            }
        }
        seen
    }

    /// Case identifier, or `unknown`
    #[must_use]
    pub fn id(&self) -> &str {
        self.case_id.as_deref().unwrap_or("unknown")
    }
}

/// Parse the redacted view out of a stage view
pub fn redacted_case(stage: &'static str, view: &CaseRecord) -> Result<CaseFile, StageError> {
    let redacted = require(stage, Field::Redacted, view.redacted.as_ref())?;
    CaseFile::from_value(stage, Field::Redacted, redacted)
}

/// Render an amount as `$1,234.56`
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}
