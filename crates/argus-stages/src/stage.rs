//! The stage abstraction

use crate::contract::StageContract;
use crate::error::StageError;
use argus_record::{CaseRecord, RecordUpdate};
use std::sync::Arc;

/// Unit of work in the pipeline
///
/// A stage sees only the fields of its declared read set and returns a
/// sparse update. It either returns the whole update or fails; partial
/// writes are impossible because the executor applies the update.
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    /// Registered name
    fn name(&self) -> &'static str;

    /// Declared read/write contract
    fn contract(&self) -> &'static StageContract;

    /// Run against a projected view of the record
    async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, StageError>;
}

/// Shared stage handle
pub type StageRef = Arc<dyn Stage>;
