//! Graph nodes: plain stages and the analyzer sub-pipeline

use crate::error::ExecutionError;
use argus_composition::AnalyzeStage;
use argus_record::{CaseRecord, RecordUpdate};
use argus_stages::{StageContract, StageRef};

/// Runnable unit registered under a stage name
#[derive(Clone)]
pub enum StageNode {
    /// A single stage
    Stage(StageRef),
    /// Dispatch, fan-out, merge and aggregate
    Analyze(AnalyzeStage),
}

impl StageNode {
    /// Name the node reports
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stage(stage) => stage.name(),
            Self::Analyze(analyze) => analyze.name(),
        }
    }

    /// Declared read/write contract
    #[must_use]
    pub fn contract(&self) -> &'static StageContract {
        match self {
            Self::Stage(stage) => stage.contract(),
            Self::Analyze(analyze) => analyze.contract(),
        }
    }

    /// Run against a projected view
    pub async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, ExecutionError> {
        match self {
            Self::Stage(stage) => Ok(stage.run(view).await?),
            Self::Analyze(analyze) => Ok(analyze.run(view).await?),
        }
    }
}

impl std::fmt::Debug for StageNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stage(stage) => f.debug_tuple("Stage").field(&stage.name()).finish(),
            Self::Analyze(analyze) => f.debug_tuple("Analyze").field(analyze).finish(),
        }
    }
}

impl From<StageRef> for StageNode {
    fn from(stage: StageRef) -> Self {
        Self::Stage(stage)
    }
}

impl From<AnalyzeStage> for StageNode {
    fn from(analyze: AnalyzeStage) -> Self {
        Self::Analyze(analyze)
    }
}
