//! Typology analyzers
//!
//! Each analyzer reads the redacted view and writes exactly one entry of
//! `analyzer_reports`, keyed by its own name. They are independent of each
//! other and run concurrently under the dispatcher.

/// `Stage` impl for an analyzer with `NAME`, `WEIGHT` and `findings`
macro_rules! analyzer_stage {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::stage::Stage for $ty {
            fn name(&self) -> &'static str {
                <$ty>::NAME
            }

            fn contract(&self) -> &'static $crate::contract::StageContract {
                &$crate::contract::ANALYZER
            }

            async fn run(
                &self,
                view: &argus_record::CaseRecord,
            ) -> Result<argus_record::RecordUpdate, $crate::error::StageError> {
                $crate::analyzers::evaluate(<$ty>::NAME, <$ty>::WEIGHT, view, <$ty>::findings)
            }
        }
    };
}

mod account_health;
mod country_risk;
mod dispute_pattern;
mod geo_anomaly;
mod payment_velocity;
mod text_content;
mod transaction_fraud;

pub use account_health::AccountHealth;
pub use country_risk::CountryRisk;
pub use dispute_pattern::DisputePattern;
pub use geo_anomaly::GeoAnomaly;
pub use payment_velocity::PaymentVelocity;
pub use text_content::TextContent;
pub use transaction_fraud::TransactionFraud;

use crate::case::{redacted_case, CaseFile};
use crate::error::StageError;
use crate::stage::StageRef;
use argus_record::{AnalyzerReport, CaseRecord, Finding, RecordUpdate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Names of every built-in analyzer
pub const ALL_ANALYZERS: [&str; 7] = [
    TransactionFraud::NAME,
    PaymentVelocity::NAME,
    CountryRisk::NAME,
    TextContent::NAME,
    GeoAnomaly::NAME,
    AccountHealth::NAME,
    DisputePattern::NAME,
];

/// Every built-in analyzer as a stage handle
#[must_use]
pub fn all_analyzers() -> Vec<StageRef> {
    vec![
        Arc::new(TransactionFraud),
        Arc::new(PaymentVelocity),
        Arc::new(CountryRisk),
        Arc::new(TextContent),
        Arc::new(GeoAnomaly),
        Arc::new(AccountHealth),
        Arc::new(DisputePattern),
    ]
}

/// Parse the view, run `detect` and wrap its findings as this analyzer's report
pub(crate) fn evaluate(
    name: &'static str,
    weight: f64,
    view: &CaseRecord,
    detect: fn(&CaseFile) -> Vec<Finding>,
) -> Result<RecordUpdate, StageError> {
    let case = redacted_case(name, view)?;
    let findings = detect(&case);
    debug!(analyzer = name, findings = findings.len(), "analyzer complete");

    let mut reports = BTreeMap::new();
    reports.insert(name.to_string(), AnalyzerReport::scored(findings, weight));
    Ok(RecordUpdate {
        analyzer_reports: Some(reports),
        ..RecordUpdate::default()
    })
}

fn ids<'a>(txns: impl IntoIterator<Item = &'a crate::case::Transaction>) -> Vec<String> {
    txns.into_iter().map(|t| t.txn_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use serde_json::json;

    #[test]
    fn registry_names_match_stage_names() {
        let names: Vec<&str> = all_analyzers().iter().map(|a| a.name()).collect();
        assert_eq!(names, ALL_ANALYZERS);
        assert!(all_analyzers()
            .iter()
            .all(|a| a.contract().writes == [argus_record::Field::AnalyzerReports]));
    }

    #[tokio::test]
    async fn each_analyzer_writes_only_its_own_key() {
        let view = CaseRecord {
            redacted: Some(json!({"transactions": [{"txn_id": "T1", "amount": 9000}]})),
            ..CaseRecord::default()
        };
        for analyzer in all_analyzers() {
            let update = analyzer.run(&view).await.unwrap();
            assert_eq!(update.populated_fields(), vec![argus_record::Field::AnalyzerReports]);
            let reports = update.analyzer_reports.unwrap();
            assert_eq!(reports.keys().collect::<Vec<_>>(), vec![analyzer.name()]);
        }
    }

    #[tokio::test]
    async fn missing_view_is_an_error() {
        let err = TransactionFraud.run(&CaseRecord::default()).await.unwrap_err();
        assert_eq!(err.stage(), "transaction_fraud");
    }
}
