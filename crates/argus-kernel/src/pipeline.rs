//! The graph executor
//!
//! Each transition projects the record to the stage's read set, runs the
//! stage, rejects writes outside its contract, folds the update in through
//! the merge policy table, appends the stage to `completed_stages`,
//! persists a checkpoint and routes. Before any stage listed in
//! `interrupt_before` the run is persisted as `paused` and control returns
//! to the caller; `resume` continues at that stage without pausing again.

use crate::checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, StageFailure,
};
use crate::config::PipelineConfig;
use crate::error::ExecutionError;
use crate::graph::{GraphBuilder, PipelineGraph};
use crate::router::{IntelRouter, QualityGateRouter};
use crate::stage_name::StageName;
use argus_composition::{AnalyzeStage, AnalyzerRegistry};
use argus_record::{CaseRecord, RecordUpdate, RunStatus};
use argus_redaction::remask;
use argus_stages::{
    DetectStage, DraftStage, FeedbackStage, FinalizeStage, GateStage, IngestStage, LookupStage,
    PlanStage, QualityJudge, RedactStage, Stage, StageRef, TemplateNarrator, TextGenerator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of `start` or `resume`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Run identifier
    pub run_id: String,
    /// `paused` or `completed`
    pub status: RunStatus,
    /// Record snapshot
    pub record: CaseRecord,
    /// Stage the run is waiting in front of
    pub paused_before: Option<StageName>,
}

impl RunOutcome {
    /// Whether the run is waiting for `resume`
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.status == RunStatus::Paused
    }
}

/// Assembles a [`Pipeline`] from collaborators and configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    generator: Arc<dyn TextGenerator>,
    judge: Option<Arc<dyn QualityJudge>>,
    registry: Option<AnalyzerRegistry>,
    store: Option<Arc<dyn CheckpointStore>>,
}

impl PipelineBuilder {
    /// Builder with the deterministic template narrator and no judge
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            generator: Arc::new(TemplateNarrator),
            judge: None,
            registry: None,
            store: None,
        }
    }

    /// Text generator for planning and drafting
    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Judge blended into the gate score
    #[must_use]
    pub fn judge(mut self, judge: Arc<dyn QualityJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Analyzer registry; the seven built-in analyzers when unset
    #[must_use]
    pub fn registry(mut self, registry: AnalyzerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Checkpoint store; derived from `checkpoint_dir` when unset
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and the stage graph
    pub fn build(self) -> Result<Pipeline, ExecutionError> {
        self.config.validate()?;

        let registry = Arc::new(
            self.registry
                .unwrap_or_else(AnalyzerRegistry::with_defaults),
        );
        let mut gate = GateStage::new(self.config.gate_threshold);
        if let Some(judge) = self.judge {
            gate = gate.with_judge(judge);
        }
        let analyze = AnalyzeStage::new(
            registry,
            self.config.default_analyzers.clone(),
            self.config.analyzer_concurrency,
        );

        let graph = GraphBuilder::new(StageName::Ingest)
            .stage(StageName::Ingest, shared(IngestStage))
            .stage(StageName::Redact, shared(RedactStage))
            .stage(StageName::Detect, shared(DetectStage))
            .stage(StageName::Plan, shared(PlanStage::new(Arc::clone(&self.generator))))
            .stage(StageName::Analyze, analyze)
            .stage(StageName::Lookup, shared(LookupStage))
            .stage(StageName::Draft, shared(DraftStage::new(Arc::clone(&self.generator))))
            .stage(StageName::Gate, shared(gate))
            .stage(StageName::Feedback, shared(FeedbackStage))
            .stage(StageName::Finalize, shared(FinalizeStage))
            .edge(StageName::Ingest, StageName::Redact)
            .edge(StageName::Redact, StageName::Detect)
            .edge(StageName::Detect, StageName::Plan)
            .edge(StageName::Plan, StageName::Analyze)
            .route(StageName::Analyze, Arc::new(IntelRouter))
            .edge(StageName::Lookup, StageName::Draft)
            .edge(StageName::Draft, StageName::Gate)
            .route(
                StageName::Gate,
                Arc::new(QualityGateRouter::new(
                    self.config.gate_threshold,
                    self.config.max_revisions,
                )),
            )
            .loop_back(StageName::Feedback, StageName::Draft)
            .terminal(StageName::Finalize)
            .build()?;

        let store: Arc<dyn CheckpointStore> = match (self.store, &self.config.checkpoint_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(FileCheckpointStore::new(dir.clone())),
            (None, None) => Arc::new(InMemoryCheckpointStore::new()),
        };

        info!(
            gate_threshold = self.config.gate_threshold,
            max_revisions = self.config.max_revisions,
            interrupt_before = ?self.config.interrupt_before,
            "pipeline assembled"
        );

        Ok(Pipeline {
            config: self.config,
            graph,
            store,
        })
    }
}

fn shared(stage: impl Stage + 'static) -> StageRef {
    Arc::new(stage)
}

/// Stateful case pipeline over a checkpoint store
pub struct Pipeline {
    config: PipelineConfig,
    graph: PipelineGraph,
    store: Arc<dyn CheckpointStore>,
}

impl Pipeline {
    /// Builder seeded with `config`
    #[must_use]
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Pipeline with default collaborators
    pub fn new(config: PipelineConfig) -> Result<Self, ExecutionError> {
        PipelineBuilder::new(config).build()
    }

    /// Fresh run identifier
    #[must_use]
    pub fn new_run_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validated stage graph
    #[must_use]
    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Checkpoint store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Run a new case from the entry stage until it pauses or completes
    pub async fn start(
        &self,
        run_id: impl Into<String>,
        record: CaseRecord,
    ) -> Result<RunOutcome, ExecutionError> {
        let run_id = run_id.into();
        let mut record = record;
        record.apply(RecordUpdate {
            revision_ceiling: Some(self.config.max_revisions),
            status: Some(RunStatus::Running),
            ..RecordUpdate::default()
        })?;

        let claim = Checkpoint::new(&run_id, record.clone(), Some(self.graph.entry()));
        if !self.store.create(&claim).await? {
            return Err(ExecutionError::RunExists { run_id });
        }
        info!(run_id = %run_id, case_id = ?record.case_id, "run started");

        self.drive(run_id, record, self.graph.entry(), false).await
    }

    /// Continue a paused run at the stage it paused before.
    ///
    /// `override_update` is merged first with last-write-wins semantics;
    /// write-once fields still reject a different value.
    pub async fn resume(
        &self,
        run_id: &str,
        override_update: Option<RecordUpdate>,
    ) -> Result<RunOutcome, ExecutionError> {
        let checkpoint = self.checkpoint(run_id).await?;
        let status = checkpoint.status();
        let next = match (status, checkpoint.next) {
            (RunStatus::Paused, Some(next)) => next,
            _ => {
                return Err(ExecutionError::NotPaused {
                    run_id: run_id.to_string(),
                    status,
                })
            }
        };

        let mut record = checkpoint.record;
        if let Some(update) = override_update {
            let fields = record.apply_override(update)?;
            info!(run_id, fields = ?fields, "applied resume override");
        }
        record.apply(RecordUpdate {
            status: Some(RunStatus::Running),
            ..RecordUpdate::default()
        })?;
        info!(run_id, stage = %next, "run resumed");

        self.drive(run_id.to_string(), record, next, true).await
    }

    /// Resume with a human-edited draft. Sensitive values in `text` are
    /// masked again with the run's redaction map before it is stored.
    pub async fn resume_with_edited_draft(
        &self,
        run_id: &str,
        text: &str,
    ) -> Result<RunOutcome, ExecutionError> {
        let checkpoint = self.checkpoint(run_id).await?;
        let masked = match &checkpoint.record.redaction_map {
            Some(mapping) => remask(text, mapping),
            None => {
                warn!(run_id, "run has no redaction map, storing edited draft as given");
                text.to_string()
            }
        };
        self.resume(
            run_id,
            Some(RecordUpdate {
                narrative_draft: Some(masked),
                ..RecordUpdate::default()
            }),
        )
        .await
    }

    /// Status of a stored run
    pub async fn get_status(&self, run_id: &str) -> Result<RunStatus, ExecutionError> {
        Ok(self.checkpoint(run_id).await?.status())
    }

    /// Record snapshot of a stored run
    pub async fn get_record(&self, run_id: &str) -> Result<CaseRecord, ExecutionError> {
        Ok(self.checkpoint(run_id).await?.record)
    }

    /// Latest checkpoint of a stored run
    pub async fn checkpoint(&self, run_id: &str) -> Result<Checkpoint, ExecutionError> {
        self.store
            .load(run_id)
            .await?
            .ok_or_else(|| ExecutionError::RunNotFound {
                run_id: run_id.to_string(),
            })
    }

    async fn drive(
        &self,
        run_id: String,
        mut record: CaseRecord,
        mut current: StageName,
        mut resumed: bool,
    ) -> Result<RunOutcome, ExecutionError> {
        loop {
            if !resumed && self.config.interrupts_before(current) {
                let mut paused = record.clone();
                paused.apply(RecordUpdate {
                    status: Some(RunStatus::Paused),
                    ..RecordUpdate::default()
                })?;
                if let Err(e) = self
                    .store
                    .save(&Checkpoint::new(&run_id, paused.clone(), Some(current)))
                    .await
                {
                    return Err(self.fail(run_id, record, current, e.into()).await);
                }
                let record = paused;
                info!(run_id = %run_id, stage = %current, "paused before stage");
                return Ok(RunOutcome {
                    run_id,
                    status: RunStatus::Paused,
                    record,
                    paused_before: Some(current),
                });
            }
            resumed = false;

            let next = match self.step(&mut record, current).await {
                Ok(next) => next,
                Err(err) => return Err(self.fail(run_id, record, current, err).await),
            };

            match next {
                Some(next) => {
                    if let Err(e) = self
                        .store
                        .save(&Checkpoint::new(&run_id, record.clone(), Some(next)))
                        .await
                    {
                        return Err(self.fail(run_id, record, current, e.into()).await);
                    }
                    current = next;
                }
                None => {
                    let mut completed = record.clone();
                    completed.apply(RecordUpdate {
                        status: Some(RunStatus::Completed),
                        ..RecordUpdate::default()
                    })?;
                    if let Err(e) = self
                        .store
                        .save(&Checkpoint::new(&run_id, completed.clone(), None))
                        .await
                    {
                        return Err(self.fail(run_id, record, current, e.into()).await);
                    }
                    let record = completed;
                    info!(
                        run_id = %run_id,
                        finalization = ?record.finalization,
                        revisions = record.revision_count(),
                        "run completed"
                    );
                    return Ok(RunOutcome {
                        run_id,
                        status: RunStatus::Completed,
                        record,
                        paused_before: None,
                    });
                }
            }
        }
    }

    /// Run one stage, fold its update in and choose the successor
    async fn step(
        &self,
        record: &mut CaseRecord,
        stage: StageName,
    ) -> Result<Option<StageName>, ExecutionError> {
        let node = self.graph.node(stage)?;
        let contract = node.contract();
        let view = record.project(contract.reads);
        debug!(stage = %stage, reads = ?contract.reads, "invoking stage");

        let mut update = node.run(&view).await?;
        let touched = update.populated_fields();
        let undeclared = contract.undeclared_writes(&touched);
        if !undeclared.is_empty() {
            return Err(ExecutionError::ContractViolation {
                stage,
                fields: undeclared,
            });
        }

        update.completed_stages = Some(vec![stage.as_str().to_string()]);
        record.apply(update)?;
        info!(stage = %stage, written = ?touched, "stage completed");

        self.graph.next(stage, record)
    }

    /// Persist the failure and wrap the cause
    async fn fail(
        &self,
        run_id: String,
        mut record: CaseRecord,
        stage: StageName,
        cause: ExecutionError,
    ) -> ExecutionError {
        error!(run_id = %run_id, stage = %stage, error = %cause, "run failed");

        if let Err(e) = record.apply(RecordUpdate {
            status: Some(RunStatus::Error),
            ..RecordUpdate::default()
        }) {
            warn!(run_id = %run_id, error = %e, "could not mark run as failed");
        }
        let checkpoint = Checkpoint::new(&run_id, record, Some(stage)).with_failure(StageFailure {
            stage,
            message: cause.to_string(),
        });
        if let Err(e) = self.store.save(&checkpoint).await {
            error!(run_id = %run_id, error = %e, "could not persist failed run");
        }

        ExecutionError::StageFailed {
            run_id,
            stage,
            source: Box::new(cause),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}
