//! Interrupts, resume overrides and persisted checkpoints

use argus_kernel::{CheckpointStore, ExecutionError, Pipeline, PipelineConfig, StageName};
use argus_record::{CaseRecord, Field, RecordError, RecordUpdate, RunStatus};
use argus_test_utils::{
    structuring_record, FixedJudge, ScriptedGenerator, SUBJECT_NAME, SUBJECT_SSN,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn pipeline(config: PipelineConfig) -> Pipeline {
    Pipeline::builder(config)
        .generator(Arc::new(ScriptedGenerator::new()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn pausing_before_finalize_matches_an_uninterrupted_run() {
    let uninterrupted = pipeline(PipelineConfig::default().without_interrupts())
        .start("straight", structuring_record())
        .await
        .unwrap()
        .record;

    let interrupted = pipeline(PipelineConfig::default());
    let paused = interrupted
        .start("paused", structuring_record())
        .await
        .unwrap();
    assert!(paused.is_paused());
    assert_eq!(paused.paused_before, Some(StageName::Finalize));
    assert!(paused.record.final_narrative.is_none());
    assert_eq!(
        interrupted.get_status("paused").await.unwrap(),
        RunStatus::Paused
    );

    let resumed = interrupted.resume("paused", None).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Completed);
    assert_eq!(resumed.paused_before, None);

    let record = resumed.record;
    assert_eq!(record.final_narrative, uninterrupted.final_narrative);
    assert_eq!(record.final_intro, uninterrupted.final_intro);
    assert_eq!(record.finalization, uninterrupted.finalization);
    assert_eq!(record.completed_stages, uninterrupted.completed_stages);
    assert_eq!(record.analyzer_reports, uninterrupted.analyzer_reports);
    assert_eq!(record.gate_verdict, uninterrupted.gate_verdict);
}

#[tokio::test]
async fn edited_draft_is_remasked_then_restored() {
    let pipeline = pipeline(PipelineConfig::default());
    pipeline
        .start("edit", structuring_record())
        .await
        .unwrap();

    let edited = format!(
        "{SUBJECT_NAME} (SSN {SUBJECT_SSN}) made cash deposits TXN-001 and TXN-002 \
         just below the reporting threshold."
    );
    let outcome = pipeline
        .resume_with_edited_draft("edit", &edited)
        .await
        .unwrap();

    let record = outcome.record;
    let stored = record.narrative_draft.as_deref().unwrap();
    assert!(!stored.contains(SUBJECT_NAME));
    assert!(!stored.contains(SUBJECT_SSN));
    assert_eq!(record.final_narrative.as_deref(), Some(edited.as_str()));
}

#[tokio::test]
async fn override_is_applied_but_write_once_fields_hold() {
    let pipeline = pipeline(PipelineConfig::default());
    pipeline
        .start("override", structuring_record())
        .await
        .unwrap();

    let err = pipeline
        .resume(
            "override",
            Some(RecordUpdate {
                case_id: Some("CASE-OTHER".to_string()),
                ..RecordUpdate::default()
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Record(RecordError::WriteOnce {
            field: Field::CaseId
        })
    ));
    assert_eq!(
        pipeline.get_status("override").await.unwrap(),
        RunStatus::Paused
    );

    let outcome = pipeline
        .resume(
            "override",
            Some(RecordUpdate {
                reviewer_note: Some("Approved after supervisor review".to_string()),
                ..RecordUpdate::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(
        outcome.record.reviewer_note.as_deref(),
        Some("Approved after supervisor review")
    );
}

#[tokio::test]
async fn only_paused_runs_resume() {
    let pipeline = pipeline(PipelineConfig::default().without_interrupts());
    pipeline.start("done", structuring_record()).await.unwrap();

    let err = pipeline.resume("done", None).await.unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::NotPaused { status: RunStatus::Completed, .. }
    ));

    let err = pipeline.resume("never-started", None).await.unwrap_err();
    assert!(matches!(err, ExecutionError::RunNotFound { .. }));
}

#[tokio::test]
async fn interrupt_inside_the_loop_pauses_on_every_entry() {
    let pipeline = Pipeline::builder(
        PipelineConfig::default()
            .with_interrupt_before([StageName::Draft])
            .with_max_revisions(1),
    )
    .judge(Arc::new(FixedJudge::always(0.0)))
    .build()
    .unwrap();

    let first = pipeline.start("loop", structuring_record()).await.unwrap();
    assert_eq!(first.paused_before, Some(StageName::Draft));
    assert!(first.record.narrative_draft.is_none());

    let second = pipeline.resume("loop", None).await.unwrap();
    assert_eq!(second.paused_before, Some(StageName::Draft));
    assert_eq!(second.record.revision_count(), 1);

    let done = pipeline.resume("loop", None).await.unwrap();
    assert_eq!(done.status, RunStatus::Completed);
    let stages = done.record.completed_stages.unwrap();
    assert_eq!(stages.iter().filter(|s| *s == "draft").count(), 2);
}

#[tokio::test]
async fn file_checkpoints_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default().with_checkpoint_dir(dir.path());

    {
        let first = pipeline(config.clone());
        let outcome = first.start("durable", structuring_record()).await.unwrap();
        assert!(outcome.is_paused());
        assert_eq!(first.store().runs().await.unwrap(), vec!["durable"]);
    }
    assert!(dir.path().join("durable.json").exists());

    let second = pipeline(config);
    let checkpoint = second.checkpoint("durable").await.unwrap();
    assert_eq!(checkpoint.next, Some(StageName::Finalize));
    assert_eq!(checkpoint.status(), RunStatus::Paused);

    let outcome = second.resume("durable", None).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);

    let reloaded: CaseRecord = second.get_record("durable").await.unwrap();
    assert_eq!(reloaded, outcome.record);
    assert_eq!(second.checkpoint("durable").await.unwrap().next, None);
}
