//! External intelligence lookup

use crate::case::redacted_case;
use crate::contract::{StageContract, LOOKUP};
use crate::error::StageError;
use crate::stage::Stage;
use argus_record::{CaseRecord, LookupResult, RecordUpdate};
use tracing::info;

/// Jurisdictions on the monitored list, with display names
pub const MONITORED_JURISDICTIONS: &[(&str, &str)] =
    &[("BZ", "Belize"), ("PA", "Panama"), ("KY", "Cayman Islands")];

/// Gathers entity, media and jurisdiction intelligence for the case
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupStage;

#[async_trait::async_trait]
impl Stage for LookupStage {
    fn name(&self) -> &'static str {
        "lookup"
    }

    fn contract(&self) -> &'static StageContract {
        &LOOKUP
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let case = redacted_case(self.name(), view)?;
        if view.plan.as_ref().is_some_and(|p| !p.requires_lookup) {
            info!(case_id = case.id(), "lookup not required by plan");
            return Ok(RecordUpdate {
                lookup_results: Some(Vec::new()),
                ..RecordUpdate::default()
            });
        }

        let mut results = Vec::new();
        for entity in &case.related_entities {
            if let Some(notes) = entity.risk_notes.as_ref().filter(|n| !n.is_empty()) {
                results.push(LookupResult {
                    source: "entity_risk_database".to_string(),
                    entity: entity.entity_name.clone(),
                    finding: notes.clone(),
                    jurisdiction: entity.jurisdiction.clone(),
                    date: None,
                    relevance: "high".to_string(),
                });
            }
        }

        let subject = case
            .subject
            .name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        for hit in &case.kyc.adverse_media_hits {
            results.push(LookupResult {
                source: format!("media_{}", hit.source.as_deref().unwrap_or("unknown")),
                entity: Some(subject.clone()),
                finding: hit.summary.clone().unwrap_or_default(),
                jurisdiction: None,
                date: hit.date.clone(),
                relevance: "medium".to_string(),
            });
        }

        let countries = case.countries();
        for (code, name) in MONITORED_JURISDICTIONS {
            if countries.contains(code) {
                results.push(LookupResult {
                    source: "fatf_jurisdiction_monitor".to_string(),
                    entity: Some((*name).to_string()),
                    finding: format!("{name} ({code}) is on the FATF monitored jurisdictions list"),
                    jurisdiction: Some((*code).to_string()),
                    date: None,
                    relevance: "high".to_string(),
                });
            }
        }

        info!(case_id = case.id(), results = results.len(), "lookup complete");
        Ok(RecordUpdate {
            lookup_results: Some(results),
            ..RecordUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_record::ExecutionPlan;
    use serde_json::json;

    #[tokio::test]
    async fn collects_entity_media_and_jurisdiction_hits() {
        let view = CaseRecord {
            redacted: Some(json!({
                "subject": {"name": "[NAME_000]"},
                "related_entities": [{"entity_name": "Oceanic Holdings", "jurisdiction": "PA", "risk_notes": "nominee directors"}],
                "kyc": {"adverse_media_hits": [{"source": "reuters", "summary": "fraud probe", "date": "2023-11-01"}]},
                "transactions": [{"txn_id": "T1", "to_country": "KY"}]
            })),
            ..CaseRecord::default()
        };
        let results = LookupStage.run(&view).await.unwrap().lookup_results.unwrap();
        let sources: Vec<&str> = results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(
            sources,
            vec!["entity_risk_database", "media_reuters", "fatf_jurisdiction_monitor"]
        );
        assert_eq!(results[1].entity.as_deref(), Some("[NAME_000]"));
        assert_eq!(results[2].jurisdiction.as_deref(), Some("KY"));
    }

    #[tokio::test]
    async fn plan_can_skip_lookup() {
        let view = CaseRecord {
            redacted: Some(json!({"related_entities": [{"risk_notes": "x"}]})),
            plan: Some(ExecutionPlan {
                requires_lookup: false,
                ..ExecutionPlan::default()
            }),
            ..CaseRecord::default()
        };
        let results = LookupStage.run(&view).await.unwrap().lookup_results.unwrap();
        assert!(results.is_empty());
    }
}
