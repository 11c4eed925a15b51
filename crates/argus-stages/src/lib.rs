//! Argus Stages
//!
//! Units of work over the case record:
//! - [`Stage`]: async `run(view) -> update` over a projected record
//! - [`StageContract`]: declared read and write sets, checked by the executor
//! - [`stages`]: ingest through finalize
//! - [`analyzers`]: typology analyzers fanned out by the dispatcher
//! - [`TextGenerator`] / [`QualityJudge`]: external collaborator seams
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_stages::{DetectStage, Stage};
//!
//! let view = record.project(DetectStage.contract().reads);
//! let update = DetectStage.run(&view).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod analyzers;
mod case;
mod collaborator;
mod contract;
mod error;
mod stage;
pub mod stages;

pub use analyzers::{all_analyzers, ALL_ANALYZERS};
pub use case::{
    format_amount, redacted_case, Account, Alert, CaseFile, DateRange, FlaggedCommunication, Kyc,
    MediaHit, RelatedEntity, Subject, Transaction, TransactionSummary,
};
pub use collaborator::{
    strip_code_fence, GeneratedJudge, GenerationRequest, GenerationRole, JudgeAssessment,
    JudgeRequest, QualityJudge, TemplateNarrator, TextGenerator,
};
pub use contract::{
    contract_for, StageContract, ANALYZE, ANALYZER, CONTRACTS, DETECT, DRAFT, FEEDBACK, FINALIZE,
    GATE, INGEST, LOOKUP, PLAN, REDACT,
};
pub use error::{require, CollaboratorError, StageError};
pub use stage::{Stage, StageRef};
pub use stages::{
    DetectStage, DraftStage, FeedbackStage, FinalizeStage, GateStage, IngestStage, LookupStage,
    PlanStage, RedactStage,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
