//! Argus Kernel
//!
//! Drives a case record through the stage graph:
//!
//! ```text
//! ingest -> redact -> detect -> plan -> analyze -+-> lookup -> draft -> gate -+-> finalize
//!                                                 +----------> draft          |
//!                                                        draft <- feedback <--+
//! ```
//!
//! # Core Concepts
//!
//! - [`PipelineGraph`]: stages, edges and routers, validated at construction
//! - [`Router`]: conditional edges ([`IntelRouter`], [`QualityGateRouter`])
//! - [`Pipeline`]: the executor with pause/resume and failure handling
//! - [`CheckpointStore`]: per-run snapshots, in memory or on disk
//! - [`PipelineConfig`]: thresholds, revision ceiling and interrupts
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_kernel::{Pipeline, PipelineConfig};
//! use argus_record::CaseRecord;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let run_id = Pipeline::new_run_id();
//!
//! let outcome = pipeline.start(&run_id, CaseRecord::new("CASE-001", payload)).await?;
//! assert!(outcome.is_paused());
//!
//! let done = pipeline.resume(&run_id, None).await?;
//! println!("{}", done.record.final_narrative.unwrap_or_default());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod checkpoint;
mod config;
mod error;
mod graph;
mod node;
mod pipeline;
mod router;
mod stage_name;

pub use checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, StageFailure,
};
pub use config::PipelineConfig;
pub use error::{CheckpointError, ConfigError, ExecutionError, GraphError};
pub use graph::{GraphBuilder, PipelineGraph, Transition};
pub use node::StageNode;
pub use pipeline::{Pipeline, PipelineBuilder, RunOutcome};
pub use router::{IntelRouter, QualityGateRouter, Router};
pub use stage_name::StageName;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
