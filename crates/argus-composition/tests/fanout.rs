//! Fan-out behaviour with misbehaving and concurrent analyzers

use argus_composition::{
    aggregate, merge, run_parallel, AnalyzeStage, AnalyzerRegistry, CompositionError,
};
use argus_record::{AnalyzerReport, CaseRecord, ExecutionPlan, Finding, RecordUpdate, Severity};
use argus_stages::{Stage, StageContract, StageError, ANALYZER};
use argus_test_utils::{FailingAnalyzer, OverreachingAnalyzer, PanickingAnalyzer, StaticAnalyzer};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn report(findings: usize, score: f64) -> AnalyzerReport {
    AnalyzerReport {
        findings: Some(
            (0..findings)
                .map(|_| Finding::new("p", Severity::Medium, 1, "d", vec![]))
                .collect(),
        ),
        risk_score: Some(score),
    }
}

fn view(analyzers: &[&str]) -> CaseRecord {
    CaseRecord {
        redacted: Some(json!({"transactions": []})),
        plan: Some(ExecutionPlan {
            analyzers: analyzers.iter().map(|s| (*s).to_string()).collect(),
            ..ExecutionPlan::default()
        }),
        ..CaseRecord::default()
    }
}

fn stage(registry: AnalyzerRegistry) -> AnalyzeStage {
    AnalyzeStage::new(Arc::new(registry), vec!["alpha".to_string()], 4)
}

#[tokio::test]
async fn failed_analyzer_is_listed_but_not_counted() {
    let mut registry = AnalyzerRegistry::new();
    registry.register(Arc::new(StaticAnalyzer::new("alpha", report(2, 0.5))));
    registry.register(Arc::new(StaticAnalyzer::new("beta", report(1, 0.3))));
    registry.register(Arc::new(FailingAnalyzer {
        name: "gamma",
        recoverable: true,
    }));

    let update = stage(registry)
        .run(&view(&["alpha", "beta", "gamma"]))
        .await
        .unwrap();

    let summary = update.analysis_summary.unwrap();
    assert_eq!(summary.agents_run, vec!["alpha", "beta"]);
    assert_eq!(summary.failed_agents, vec!["gamma"]);
    assert_eq!(summary.total_findings, 3);
    assert_eq!(summary.average_risk_score, 0.4);
    assert!(!update.analyzer_reports.unwrap().contains_key("gamma"));
}

#[tokio::test]
async fn panicking_analyzer_is_contained() {
    let mut registry = AnalyzerRegistry::new();
    registry.register(Arc::new(StaticAnalyzer::new("alpha", report(1, 0.2))));
    registry.register(Arc::new(PanickingAnalyzer { name: "boom" }));

    let update = stage(registry).run(&view(&["alpha", "boom"])).await.unwrap();
    let summary = update.analysis_summary.unwrap();
    assert_eq!(summary.agents_run, vec!["alpha"]);
    assert_eq!(summary.failed_agents, vec!["boom"]);
    assert_eq!(summary.average_risk_score, 0.2);
}

#[tokio::test]
async fn unrecoverable_analyzer_error_is_fatal() {
    let mut registry = AnalyzerRegistry::new();
    registry.register(Arc::new(StaticAnalyzer::new("alpha", report(1, 0.2))));
    registry.register(Arc::new(FailingAnalyzer {
        name: "broken",
        recoverable: false,
    }));

    let err = stage(registry)
        .run(&view(&["alpha", "broken"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CompositionError::Stage(StageError::MalformedInput { stage: "broken", .. })
    ));
}

#[tokio::test]
async fn analyzer_writing_outside_its_contract_is_rejected() {
    let mut registry = AnalyzerRegistry::new();
    registry.register(Arc::new(OverreachingAnalyzer { name: "alpha" }));

    let err = stage(registry).run(&view(&["alpha"])).await.unwrap_err();
    assert!(matches!(err, CompositionError::ContractViolation { ref analyzer, .. } if analyzer == "alpha"));
}

/// Reports under its own name plus any extra keys it is given
struct Impostor {
    claims: &'static [&'static str],
}

#[async_trait::async_trait]
impl Stage for Impostor {
    fn name(&self) -> &'static str {
        "impostor"
    }

    fn contract(&self) -> &'static StageContract {
        &ANALYZER
    }

    async fn run(&self, _: &CaseRecord) -> Result<RecordUpdate, StageError> {
        Ok(RecordUpdate {
            analyzer_reports: Some(
                self.claims
                    .iter()
                    .map(|key| ((*key).to_string(), report(3, 0.9)))
                    .collect(),
            ),
            ..RecordUpdate::default()
        })
    }
}

#[tokio::test]
async fn report_under_another_analyzers_key_is_rejected() {
    for claims in [&["country_risk"][..], &["impostor", "country_risk"][..]] {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Arc::new(Impostor { claims }));

        let err = stage(registry).run(&view(&["impostor"])).await.unwrap_err();
        assert!(matches!(
            err,
            CompositionError::ForeignReport { ref analyzer, ref keys }
                if analyzer == "impostor" && keys == &vec!["country_risk".to_string()]
        ));
    }
}

#[tokio::test]
async fn report_under_own_key_is_accepted() {
    let mut registry = AnalyzerRegistry::new();
    registry.register(Arc::new(Impostor { claims: &["impostor"] }));

    let update = stage(registry).run(&view(&["impostor"])).await.unwrap();
    assert_eq!(update.analysis_summary.unwrap().agents_run, vec!["impostor"]);
}

/// Records the peak number of concurrent runs
struct Gauge {
    name: &'static str,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Stage for Gauge {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contract(&self) -> &'static StageContract {
        &ANALYZER
    }

    async fn run(&self, _: &CaseRecord) -> Result<RecordUpdate, StageError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(RecordUpdate {
            analyzer_reports: Some(BTreeMap::from([(self.name.to_string(), report(0, 0.0))])),
            ..RecordUpdate::default()
        })
    }
}

#[tokio::test]
async fn concurrency_is_bounded() {
    const NAMES: [&str; 6] = ["a1", "a2", "a3", "a4", "a5", "a6"];
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut registry = AnalyzerRegistry::new();
    for name in NAMES {
        registry.register(Arc::new(Gauge {
            name,
            in_flight: Arc::clone(&in_flight),
            peak: Arc::clone(&peak),
        }));
    }
    let names: Vec<String> = NAMES.iter().map(|s| (*s).to_string()).collect();

    let out = run_parallel(&registry, &names, Arc::new(CaseRecord::default()), 2)
        .await
        .unwrap();

    assert_eq!(out.updates.len(), 6);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

fn updates(entries: &[(String, usize, f64)]) -> Vec<RecordUpdate> {
    entries
        .iter()
        .map(|(name, findings, score)| RecordUpdate {
            analyzer_reports: Some(BTreeMap::from([(name.clone(), report(*findings, *score))])),
            ..RecordUpdate::default()
        })
        .collect()
}

fn entries_and_permutation(
) -> impl Strategy<Value = (Vec<(String, usize, f64)>, Vec<(String, usize, f64)>)> {
    proptest::collection::btree_map("[a-z]{1,6}", (0usize..5, 0.0f64..1.0), 1..8)
        .prop_map(|m| m.into_iter().map(|(k, (n, s))| (k, n, s)).collect::<Vec<_>>())
        .prop_flat_map(|entries| (Just(entries.clone()), Just(entries).prop_shuffle()))
}

proptest! {
    #[test]
    fn prop_aggregate_is_order_independent((entries, shuffled) in entries_and_permutation()) {
        let forward = aggregate(&merge(updates(&entries)).unwrap(), &[]);
        let permuted = aggregate(&merge(updates(&shuffled)).unwrap(), &[]);
        prop_assert_eq!(forward, permuted);
    }
}
