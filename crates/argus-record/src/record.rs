//! The case record and its merge engine
//!
//! Stages never mutate the record directly. They return a sparse
//! [`RecordUpdate`] and the executor folds it in with [`CaseRecord::apply`],
//! which consults the per-field [`MergePolicy`] table. Validation runs over
//! every touched field before anything is written, so a rejected update
//! leaves the record untouched.

use crate::error::RecordError;
use crate::field::{Field, MergePolicy};
use crate::redaction_map::RedactionMap;
use crate::status::{validate_transition, RunStatus};
use crate::types::{
    AggregateSummary, AnalyzerReport, CrimeCategory, ExecutionPlan, Finalization, GateVerdict,
    LookupResult, RiskIndicator,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Shared case document. Every field is optional until populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Case identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    /// Raw case payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Structured, unredacted view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<Value>,
    /// Derived view with sensitive leaves replaced by placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacted: Option<Value>,
    /// Placeholder mapping produced by redaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redaction_map: Option<RedactionMap>,
    /// Detected risk indicators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_indicators: Option<Vec<RiskIndicator>>,
    /// Classified categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CrimeCategory>>,
    /// Analyzer name -> report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer_reports: Option<BTreeMap<String, AnalyzerReport>>,
    /// Aggregate over analyzer reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_summary: Option<AggregateSummary>,
    /// Analyzer selection and routing hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ExecutionPlan>,
    /// External lookup results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_results: Option<Vec<LookupResult>>,
    /// Current narrative draft (redacted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_draft: Option<String>,
    /// Introductory section (redacted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_intro: Option<String>,
    /// Ordered reasoning steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_trace: Option<Vec<String>>,
    /// Latest quality-gate verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_verdict: Option<GateVerdict>,
    /// Feedback iterations completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_count: Option<u32>,
    /// Maximum feedback iterations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_ceiling: Option<u32>,
    /// Human-supplied revision note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_note: Option<String>,
    /// Consolidated instructions for the next draft
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_instructions: Option<String>,
    /// Run status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    /// Names of stages that completed, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_stages: Option<Vec<String>>,
    /// De-redacted narrative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_narrative: Option<String>,
    /// De-redacted introduction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_intro: Option<String>,
    /// How finalization was reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalization: Option<Finalization>,
}

/// Sparse record holding only the fields a stage writes
pub type RecordUpdate = CaseRecord;

/// How keyed-union fields treat a repeated key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// A repeated key is a collision
    #[default]
    Strict,
    /// A repeated key is replaced (used for resume overrides)
    Override,
}

macro_rules! record_fields {
    ($($variant:ident => $name:ident),* $(,)?) => {
        impl CaseRecord {
            /// Whether `field` is populated
            #[must_use]
            pub fn is_set(&self, field: Field) -> bool {
                match field {
                    $(Field::$variant => self.$name.is_some(),)*
                }
            }

            fn same_value(&self, other: &CaseRecord, field: Field) -> bool {
                match field {
                    $(Field::$variant => self.$name == other.$name,)*
                }
            }

            fn clone_field_from(&mut self, source: &CaseRecord, field: Field) {
                match field {
                    $(Field::$variant => self.$name.clone_from(&source.$name),)*
                }
            }

            fn take_field_from(&mut self, source: &mut CaseRecord, field: Field) {
                match field {
                    $(Field::$variant => {
                        if let Some(value) = source.$name.take() {
                            self.$name = Some(value);
                        }
                    })*
                }
            }
        }
    };
}

record_fields! {
    CaseId => case_id,
    Input => input,
    Derived => derived,
    Redacted => redacted,
    RedactionMap => redaction_map,
    RiskIndicators => risk_indicators,
    Categories => categories,
    AnalyzerReports => analyzer_reports,
    AnalysisSummary => analysis_summary,
    Plan => plan,
    LookupResults => lookup_results,
    NarrativeDraft => narrative_draft,
    NarrativeIntro => narrative_intro,
    ReasoningTrace => reasoning_trace,
    GateVerdict => gate_verdict,
    RevisionCount => revision_count,
    RevisionCeiling => revision_ceiling,
    ReviewerNote => reviewer_note,
    RevisionInstructions => revision_instructions,
    Status => status,
    CompletedStages => completed_stages,
    FinalNarrative => final_narrative,
    FinalIntro => final_intro,
    Finalization => finalization,
}

impl CaseRecord {
    /// Fresh record for a case with its raw payload
    #[must_use]
    pub fn new(case_id: impl Into<String>, input: Value) -> Self {
        Self {
            case_id: Some(case_id.into()),
            input: Some(input),
            ..Self::default()
        }
    }

    /// Fields that hold a value, in record order
    #[must_use]
    pub fn populated_fields(&self) -> Vec<Field> {
        Field::ALL.into_iter().filter(|f| self.is_set(*f)).collect()
    }

    /// Copy containing only `fields`
    #[must_use]
    pub fn project(&self, fields: &[Field]) -> CaseRecord {
        let mut view = CaseRecord::default();
        for field in fields {
            view.clone_field_from(self, *field);
        }
        view
    }

    /// Current status, `idle` until set
    #[inline]
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status.unwrap_or_default()
    }

    /// Feedback iterations so far, 0 until set
    #[inline]
    #[must_use]
    pub fn revision_count(&self) -> u32 {
        self.revision_count.unwrap_or(0)
    }

    /// Merge `update` under the field policy table, rejecting key collisions.
    /// Returns the fields the update touched.
    pub fn apply(&mut self, update: RecordUpdate) -> Result<Vec<Field>, RecordError> {
        self.apply_with(update, MergeMode::Strict)
    }

    /// Merge with last-write-wins on analyzer keys. Write-once fields still
    /// reject a different value.
    pub fn apply_override(&mut self, update: RecordUpdate) -> Result<Vec<Field>, RecordError> {
        self.apply_with(update, MergeMode::Override)
    }

    /// Validate every touched field, then write them all
    pub fn apply_with(
        &mut self,
        mut update: RecordUpdate,
        mode: MergeMode,
    ) -> Result<Vec<Field>, RecordError> {
        let touched = update.populated_fields();
        for field in &touched {
            self.check(&update, *field, mode)?;
        }
        for field in &touched {
            self.write(&mut update, *field);
        }
        Ok(touched)
    }

    fn check(&self, update: &CaseRecord, field: Field, mode: MergeMode) -> Result<(), RecordError> {
        match field.merge_policy() {
            MergePolicy::WriteOnce => {
                if self.is_set(field) && !self.same_value(update, field) {
                    return Err(RecordError::WriteOnce { field });
                }
            }
            MergePolicy::KeyedUnion => {
                if mode == MergeMode::Strict {
                    if let (Some(current), Some(incoming)) =
                        (&self.analyzer_reports, &update.analyzer_reports)
                    {
                        if let Some(key) = incoming.keys().find(|k| current.contains_key(*k)) {
                            return Err(RecordError::KeyCollision {
                                field,
                                key: key.clone(),
                            });
                        }
                    }
                }
            }
            MergePolicy::Monotonic => {
                let from = self.revision_count();
                let to = update.revision_count();
                if to < from {
                    return Err(RecordError::NonMonotonic { field, from, to });
                }
            }
            MergePolicy::Transition => {
                if let Some(to) = update.status {
                    validate_transition(self.status(), to)?;
                }
            }
            MergePolicy::LastWriteWins | MergePolicy::Append => {}
        }
        Ok(())
    }

    fn write(&mut self, update: &mut CaseRecord, field: Field) {
        match field.merge_policy() {
            MergePolicy::KeyedUnion => {
                if let Some(incoming) = update.analyzer_reports.take() {
                    self.analyzer_reports
                        .get_or_insert_with(BTreeMap::new)
                        .extend(incoming);
                }
            }
            MergePolicy::Append => {
                if let Some(incoming) = update.completed_stages.take() {
                    self.completed_stages
                        .get_or_insert_with(Vec::new)
                        .extend(incoming);
                }
            }
            MergePolicy::WriteOnce if self.is_set(field) => {}
            _ => self.take_field_from(update, field),
        }
    }
}
