//! Raw payload -> structured case view

use crate::case::{
    Account, Alert, CaseFile, DateRange, FlaggedCommunication, Kyc, MediaHit, RelatedEntity,
    Subject, Transaction, TransactionSummary,
};
use crate::contract::{StageContract, INGEST};
use crate::error::{require, StageError};
use crate::stage::Stage;
use argus_record::{CaseRecord, Field, RecordUpdate};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::info;

const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCase {
    case_id: Option<String>,
    alert_date: Option<String>,
    priority: Option<String>,
    subject: Subject,
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    kyc: RawKyc,
    communications: Vec<RawCommunication>,
    alerts: Vec<Alert>,
    related_entities: Vec<RelatedEntity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawKyc {
    verification_status: Option<String>,
    source_of_funds: Option<String>,
    expected_activity: Option<String>,
    actual_activity_profile: Option<String>,
    pep_status: bool,
    adverse_media_hits: Vec<MediaHit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCommunication {
    date: Option<String>,
    channel: Option<String>,
    content: String,
    flag_reason: Option<String>,
    flagged: bool,
}

/// Direction of funds implied by a transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    In,
    Out,
    Neutral,
}

fn flow_of(kind: &str) -> Flow {
    let lower = kind.to_ascii_lowercase();
    let has_token = |wanted: &[&str]| {
        lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|t| wanted.contains(&t))
    };
    if lower.contains("deposit") || has_token(&["in", "inbound", "incoming", "credit"]) {
        Flow::In
    } else if lower.contains("withdrawal") || has_token(&["out", "outbound", "outgoing", "debit"]) {
        Flow::Out
    } else {
        Flow::Neutral
    }
}

/// Normalizes the raw payload into the structured case view
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStage;

impl IngestStage {
    fn normalize(raw: RawCase, fallback_id: Option<&str>) -> CaseFile {
        let mut total_inflow = 0.0;
        let mut total_outflow = 0.0;
        let mut flags = BTreeSet::new();
        let transactions: Vec<Transaction> = raw
            .transactions
            .into_iter()
            .map(|mut txn| {
                txn.currency.get_or_insert_with(|| "USD".to_string());
                match flow_of(&txn.kind) {
                    Flow::In => total_inflow += txn.amount,
                    Flow::Out => total_outflow += txn.amount,
                    Flow::Neutral => {}
                }
                flags.extend(txn.risk_flags.iter().cloned());
                txn
            })
            .collect();

        let accounts = raw
            .accounts
            .into_iter()
            .map(|mut acc| {
                acc.currency.get_or_insert_with(|| "USD".to_string());
                acc
            })
            .collect();

        let mut subject = raw.subject;
        subject.name.get_or_insert_with(|| "Unknown".to_string());
        subject.risk_rating.get_or_insert_with(|| "medium".to_string());

        let kyc = Kyc {
            verification_status: Some(
                raw.kyc
                    .verification_status
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            activity_mismatch: raw.kyc.expected_activity != raw.kyc.actual_activity_profile,
            source_of_funds: raw.kyc.source_of_funds,
            expected_activity: raw.kyc.expected_activity,
            actual_activity_profile: raw.kyc.actual_activity_profile,
            pep_status: raw.kyc.pep_status,
            adverse_media_count: raw.kyc.adverse_media_hits.len(),
            adverse_media_hits: raw.kyc.adverse_media_hits,
        };

        let flagged_communications = raw
            .communications
            .into_iter()
            .filter(|c| c.flagged)
            .map(|c| FlaggedCommunication {
                date: c.date,
                channel: c.channel,
                content_snippet: c.content.chars().take(SNIPPET_CHARS).collect(),
                flag_reason: c.flag_reason,
            })
            .collect();

        let transaction_summary = TransactionSummary {
            count: transactions.len(),
            total_inflow,
            total_outflow,
            date_range: DateRange {
                start: transactions.first().map(|t| t.date.clone()),
                end: transactions.last().map(|t| t.date.clone()),
            },
            unique_risk_flags: flags.into_iter().collect(),
        };

        CaseFile {
            case_id: raw.case_id.or_else(|| fallback_id.map(str::to_string)),
            alert_date: raw.alert_date,
            priority: Some(raw.priority.unwrap_or_else(|| "medium".to_string())),
            subject,
            accounts,
            transactions,
            transaction_summary,
            kyc,
            flagged_communications,
            alerts: raw.alerts,
            related_entities: raw.related_entities,
        }
    }
}

#[async_trait::async_trait]
impl Stage for IngestStage {
    fn name(&self) -> &'static str {
        "ingest"
    }

    fn contract(&self) -> &'static StageContract {
        &INGEST
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let input = require(self.name(), Field::Input, view.input.as_ref())?;
        let raw: RawCase =
            serde_json::from_value(input.clone()).map_err(|e| StageError::MalformedInput {
                stage: self.name(),
                field: Field::Input,
                reason: e.to_string(),
            })?;
        let case = Self::normalize(raw, view.case_id.as_deref());

        info!(
            case_id = case.id(),
            transactions = case.transactions.len(),
            alerts = case.alerts.len(),
            risk_flags = case.transaction_summary.unique_risk_flags.len(),
            "ingestion complete"
        );

        Ok(RecordUpdate {
            derived: Some(case.to_value()),
            ..RecordUpdate::default()
        })
    }
}
