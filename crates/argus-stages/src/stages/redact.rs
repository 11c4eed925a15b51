//! Structured view -> redacted view + placeholder map

use crate::contract::{StageContract, REDACT};
use crate::error::{require, StageError};
use crate::stage::Stage;
use argus_record::{CaseRecord, Field, RecordUpdate};
use tracing::info;

/// Masks every sensitive value of the structured view
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactStage;

#[async_trait::async_trait]
impl Stage for RedactStage {
    fn name(&self) -> &'static str {
        "redact"
    }

    fn contract(&self) -> &'static StageContract {
        &REDACT
    }

    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let derived = require(self.name(), Field::Derived, view.derived.as_ref())?;
        let (redacted, mapping) = argus_redaction::mask(derived);
        info!(masked = mapping.len(), "redaction complete");
        Ok(RecordUpdate {
            redacted: Some(redacted),
            redaction_map: Some(mapping),
            ..RecordUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn redacted_view_hides_subject() {
        let view = CaseRecord {
            derived: Some(json!({"subject": {"name": "Jane Roe", "ssn": "123-45-6789"}})),
            ..CaseRecord::default()
        };
        let update = RedactStage.run(&view).await.unwrap();
        let redacted = update.redacted.unwrap().to_string();
        assert!(!redacted.contains("Jane Roe"));
        assert!(!redacted.contains("123-45-6789"));
        assert_eq!(update.redaction_map.unwrap().len(), 2);
    }
}
