//! Concurrent analyzer execution

use crate::error::CompositionError;
use crate::registry::AnalyzerRegistry;
use argus_record::{CaseRecord, Field, RecordUpdate};
use argus_stages::{StageError, StageRef};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of one fan-out
#[derive(Debug, Default)]
pub struct FanOut {
    /// Successful updates keyed by analyzer, in name order
    pub updates: Vec<(String, RecordUpdate)>,
    /// Analyzers that failed recoverably or panicked, sorted
    pub failed: Vec<String>,
}

enum TaskResult {
    Done(Result<RecordUpdate, StageError>),
    Panicked(String),
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run `names` against a shared read-only snapshot.
///
/// At most `concurrency` analyzers are in flight at once. Names missing
/// from the registry are skipped. Every task has finished (or been
/// dropped on a fatal error) when this returns.
pub async fn run_parallel(
    registry: &AnalyzerRegistry,
    names: &[String],
    snapshot: Arc<CaseRecord>,
    concurrency: usize,
) -> Result<FanOut, CompositionError> {
    let limiter = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for name in names {
        let Some(analyzer) = registry.get(name).cloned() else {
            warn!(analyzer = %name, "not registered, skipping");
            continue;
        };
        let permit = Arc::clone(&limiter)
            .acquire_owned()
            .await
            .map_err(|_| CompositionError::SchedulerClosed)?;
        let snapshot = Arc::clone(&snapshot);
        let name = name.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let result = run_one(&analyzer, &snapshot).await;
            (name, result)
        });
    }

    let mut out = FanOut::default();
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = joined.map_err(|e| CompositionError::Cancelled(e.to_string()))?;
        match result {
            TaskResult::Done(Ok(update)) => {
                let undeclared: Vec<Field> = update
                    .populated_fields()
                    .into_iter()
                    .filter(|f| *f != Field::AnalyzerReports)
                    .collect();
                if !undeclared.is_empty() {
                    return Err(CompositionError::ContractViolation {
                        analyzer: name,
                        fields: undeclared,
                    });
                }
                let foreign: Vec<String> = update
                    .analyzer_reports
                    .iter()
                    .flat_map(|reports| reports.keys())
                    .filter(|key| **key != name)
                    .cloned()
                    .collect();
                if !foreign.is_empty() {
                    return Err(CompositionError::ForeignReport {
                        analyzer: name,
                        keys: foreign,
                    });
                }
                debug!(analyzer = %name, "analyzer finished");
                out.updates.push((name, update));
            }
            TaskResult::Done(Err(e)) if e.is_recoverable() => {
                warn!(analyzer = %name, error = %e, "analyzer failed, excluded from merge");
                out.failed.push(name);
            }
            TaskResult::Done(Err(e)) => return Err(e.into()),
            TaskResult::Panicked(message) => {
                warn!(analyzer = %name, panic = %message, "analyzer panicked, excluded from merge");
                out.failed.push(name);
            }
        }
    }

    out.updates.sort_by(|a, b| a.0.cmp(&b.0));
    out.failed.sort();
    Ok(out)
}

async fn run_one(analyzer: &StageRef, snapshot: &CaseRecord) -> TaskResult {
    match AssertUnwindSafe(analyzer.run(snapshot)).catch_unwind().await {
        Ok(result) => TaskResult::Done(result),
        Err(payload) => TaskResult::Panicked(panic_message(payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_stages::all_analyzers;
    use serde_json::json;

    fn snapshot() -> Arc<CaseRecord> {
        Arc::new(CaseRecord {
            redacted: Some(json!({"transactions": [
                {"txn_id": "T1", "amount": 9500.0},
                {"txn_id": "T2", "amount": 9800.0}
            ]})),
            ..CaseRecord::default()
        })
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn runs_every_named_analyzer() {
        let registry = AnalyzerRegistry::with_defaults();
        let all: Vec<String> = all_analyzers().iter().map(|a| a.name().to_string()).collect();
        let out = run_parallel(&registry, &all, snapshot(), 2).await.unwrap();
        assert_eq!(out.updates.len(), all.len());
        assert!(out.failed.is_empty());
        assert!(out.updates.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[tokio::test]
    async fn unregistered_names_are_skipped() {
        let registry = AnalyzerRegistry::with_defaults();
        let out = run_parallel(&registry, &names(&["bogus", "country_risk"]), snapshot(), 1)
            .await
            .unwrap();
        assert_eq!(out.updates.len(), 1);
        assert_eq!(out.updates[0].0, "country_risk");
    }

    #[tokio::test]
    async fn missing_view_is_fatal() {
        let registry = AnalyzerRegistry::with_defaults();
        let err = run_parallel(
            &registry,
            &names(&["country_risk"]),
            Arc::new(CaseRecord::default()),
            4,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CompositionError::Stage(StageError::MissingInput { .. })));
    }
}
