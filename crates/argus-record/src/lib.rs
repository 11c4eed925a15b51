//! Argus Case Record
//!
//! The single mutable document threaded through every pipeline stage:
//! - [`CaseRecord`]: namespaced, individually optional fields
//! - [`Field`] and [`MergePolicy`]: the per-field merge policy table
//! - [`RedactionMap`]: append-only placeholder mapping
//! - [`RunStatus`]: run lifecycle with a validated transition table
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_record::{CaseRecord, RecordUpdate};
//!
//! let mut record = CaseRecord::new("CASE-001", serde_json::json!({"case_id": "CASE-001"}));
//!
//! let update = RecordUpdate {
//!     narrative_draft: Some("draft".to_string()),
//!     ..RecordUpdate::default()
//! };
//! let touched = record.apply(update)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod field;
mod record;
mod redaction_map;
mod status;
mod types;

pub use error::RecordError;
pub use field::{Field, MergePolicy, Partition};
pub use record::{CaseRecord, MergeMode, RecordUpdate};
pub use redaction_map::RedactionMap;
pub use status::{allowed_transitions, validate_transition, RunStatus};
pub use types::{
    AggregateSummary, AnalyzerReport, CrimeCategory, ExecutionPlan, Finalization, Finding,
    GateCheck, GateVerdict, LookupResult, RiskIndicator, Severity,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
