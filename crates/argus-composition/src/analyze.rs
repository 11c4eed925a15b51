//! The analyze sub-pipeline: dispatch, fan-out, merge, aggregate

use crate::aggregate::aggregate;
use crate::dispatch::dispatch;
use crate::error::CompositionError;
use crate::fanout::run_parallel;
use crate::merge::merge;
use crate::registry::AnalyzerRegistry;
use argus_record::{CaseRecord, RecordUpdate};
use argus_stages::{StageContract, ANALYZE, ANALYZER};
use std::sync::Arc;
use tracing::info;

/// Runs the planned analyzers in parallel and writes their merged reports
/// together with the aggregate summary
#[derive(Debug, Clone)]
pub struct AnalyzeStage {
    registry: Arc<AnalyzerRegistry>,
    defaults: Vec<String>,
    concurrency: usize,
}

impl AnalyzeStage {
    /// Create over `registry`
    #[must_use]
    pub fn new(registry: Arc<AnalyzerRegistry>, defaults: Vec<String>, concurrency: usize) -> Self {
        Self {
            registry,
            defaults,
            concurrency,
        }
    }

    /// Registered name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        ANALYZE.name
    }

    /// Declared read/write contract
    #[inline]
    #[must_use]
    pub fn contract(&self) -> &'static StageContract {
        &ANALYZE
    }

    /// Analyzer registry
    #[must_use]
    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    /// Run against a projected view of the record
    pub async fn run(&self, view: &CaseRecord) -> Result<RecordUpdate, CompositionError> {
        let names = dispatch(view.plan.as_ref(), &self.registry, &self.defaults);
        let snapshot = Arc::new(view.project(ANALYZER.reads));

        let fan_out = run_parallel(&self.registry, &names, snapshot, self.concurrency).await?;
        let reports = merge(fan_out.updates.into_iter().map(|(_, update)| update))?;
        let summary = aggregate(&reports, &fan_out.failed);

        info!(
            dispatched = names.len(),
            succeeded = summary.agent_count(),
            failed = summary.failed_agents.len(),
            findings = summary.total_findings,
            average_risk_score = summary.average_risk_score,
            "analysis complete"
        );

        Ok(RecordUpdate {
            analyzer_reports: Some(reports),
            analysis_summary: Some(summary),
            ..RecordUpdate::default()
        })
    }
}
