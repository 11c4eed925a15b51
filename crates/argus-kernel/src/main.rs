//! Argus command line

use anyhow::{bail, Context, Result};
use argus_kernel::{FileCheckpointStore, CheckpointStore, Pipeline, PipelineConfig, RunOutcome};
use argus_record::CaseRecord;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("argus")
        .version(argus_kernel::VERSION)
        .about("Case narrative pipeline")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run a case through the pipeline, approving any pause")
                .arg(
                    Arg::new("case")
                        .long("case")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the case JSON payload"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to a TOML pipeline configuration"),
                )
                .arg(
                    Arg::new("no-interrupt")
                        .long("no-interrupt")
                        .action(ArgAction::SetTrue)
                        .help("Run straight through without pausing"),
                )
                .arg(
                    Arg::new("checkpoint-dir")
                        .long("checkpoint-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Persist checkpoints as files in this directory"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show a persisted run")
                .arg(
                    Arg::new("run-id")
                        .long("run-id")
                        .required(true)
                        .help("Run identifier"),
                )
                .arg(
                    Arg::new("checkpoint-dir")
                        .long("checkpoint-dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding the checkpoints"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("status", args)) => status(args).await,
        _ => bail!("unknown command"),
    }
}

async fn run(args: &ArgMatches) -> Result<()> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if args.get_flag("no-interrupt") {
        config = config.without_interrupts();
    }
    if let Some(dir) = args.get_one::<PathBuf>("checkpoint-dir") {
        config = config.with_checkpoint_dir(dir);
    }

    let case_path = args
        .get_one::<PathBuf>("case")
        .context("--case is required")?;
    let raw = std::fs::read_to_string(case_path)
        .with_context(|| format!("reading case {}", case_path.display()))?;
    let payload: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing case {}", case_path.display()))?;
    let case_id = payload
        .get("case_id")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN")
        .to_string();

    let pipeline = Pipeline::new(config)?;
    let run_id = Pipeline::new_run_id();

    let mut outcome = pipeline
        .start(&run_id, CaseRecord::new(case_id, payload))
        .await?;
    while let Some(stage) = outcome.paused_before {
        eprintln!("run {run_id} paused before `{stage}`, approving");
        outcome = pipeline.resume(&run_id, None).await?;
    }

    println!("{}", serde_json::to_string_pretty(&summary(&outcome))?);
    Ok(())
}

fn summary(outcome: &RunOutcome) -> Value {
    let record = &outcome.record;
    json!({
        "run_id": outcome.run_id,
        "status": outcome.status,
        "case_id": record.case_id,
        "finalization": record.finalization,
        "revision_count": record.revision_count(),
        "gate_score": record.gate_verdict.as_ref().map(|v| v.score),
        "categories": record.categories,
        "analysis_summary": record.analysis_summary,
        "final_intro": record.final_intro,
        "final_narrative": record.final_narrative,
    })
}

async fn status(args: &ArgMatches) -> Result<()> {
    let run_id = args
        .get_one::<String>("run-id")
        .context("--run-id is required")?;
    let dir = args
        .get_one::<PathBuf>("checkpoint-dir")
        .context("--checkpoint-dir is required")?;

    let store = FileCheckpointStore::new(dir);
    let Some(checkpoint) = store.load(run_id).await? else {
        bail!("no checkpoint for run {run_id} in {}", dir.display());
    };

    let report = json!({
        "run_id": checkpoint.run_id,
        "status": checkpoint.status(),
        "next": checkpoint.next,
        "failure": checkpoint.failure,
        "completed_stages": checkpoint.record.completed_stages,
        "revision_count": checkpoint.record.revision_count(),
        "updated_at": checkpoint.updated_at,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
