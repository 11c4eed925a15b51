//! Testing utilities for the Argus workspace
//!
//! Shared fixtures, collaborator doubles and misbehaving analyzers.

#![allow(missing_docs)]

use argus_record::{AnalyzerReport, CaseRecord, RecordUpdate};
use argus_stages::{
    CollaboratorError, GenerationRequest, GenerationRole, JudgeAssessment, JudgeRequest,
    QualityJudge, Stage, StageContract, StageError, TemplateNarrator, TextGenerator, ANALYZER,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SUBJECT_NAME: &str = "Jane Roe";
pub const SUBJECT_SSN: &str = "123-45-6789";
pub const SUBJECT_EMAIL: &str = "jane.roe@example.com";

/// Raw payload for a two-deposit structuring case
pub fn structuring_case() -> Value {
    json!({
        "case_id": "CASE-2024-001",
        "alert_date": "2024-01-20",
        "priority": "high",
        "subject": {
            "name": SUBJECT_NAME,
            "dob": "1980-04-12",
            "ssn": SUBJECT_SSN,
            "address": "12 Harbor Lane, Springfield",
            "phone": "555-201-3344",
            "email": SUBJECT_EMAIL,
            "occupation": "Retail clerk",
            "customer_since": "2019-06-01"
        },
        "accounts": [
            {"account_id": "ACC-1001", "account_type": "checking", "balance": 18400.0}
        ],
        "transactions": [
            {
                "txn_id": "TXN-001",
                "date": "2024-01-08",
                "type": "cash_deposit",
                "amount": 9500.0,
                "location": "Springfield Branch",
                "description": "Cash deposit at teller",
                "risk_flags": ["near_threshold"]
            },
            {
                "txn_id": "TXN-002",
                "date": "2024-01-12",
                "type": "cash_deposit",
                "amount": 9800.0,
                "location": "Springfield Branch",
                "description": "Cash deposit at teller",
                "risk_flags": ["near_threshold"]
            }
        ],
        "kyc": {
            "verification_status": "verified",
            "source_of_funds": "employment",
            "expected_activity": "payroll deposits",
            "actual_activity_profile": "large cash deposits",
            "pep_status": false,
            "adverse_media_hits": []
        },
        "communications": [
            {
                "date": "2024-01-07",
                "channel": "email",
                "content": "Please keep each deposit under the limit. Contact me at jane.roe@example.com",
                "flagged": true,
                "flag_reason": "structuring_language"
            }
        ],
        "alerts": [
            {"alert_id": "ALT-1", "type": "structuring", "severity": "high", "triggered_date": "2024-01-13"}
        ],
        "related_entities": []
    })
}

/// Fresh record for [`structuring_case`]
pub fn structuring_record() -> CaseRecord {
    CaseRecord::new("CASE-2024-001", structuring_case())
}

/// Sectioned narrative long enough to clear the rule checks, citing `txn_ids`
pub fn sectioned_narrative(subject: &str, txn_ids: &[&str]) -> String {
    let mut body = String::new();
    for (i, id) in txn_ids.iter().enumerate() {
        body.push_str(&format!(
            "On 2024-01-{:02}, transaction {id} recorded a cash deposit of $9,{}00.00 at the \
             Springfield branch, an amount just below the $10,000.00 reporting threshold. ",
            8 + i * 4,
            5 + i * 3,
        ));
    }
    let filler = "The deposits were made in person, in currency, and do not match the \
                  declared payroll profile of the customer. No legitimate business purpose \
                  was identified during the review, and the customer did not provide any \
                  documentation explaining the source of the currency. ";
    format!(
        "REASONING:\n- Step 1: reviewed deposits\n- Step 2: compared against profile\n\n\
         NARRATIVE_INTRO:\nThis report concerns {subject}, who made repeated cash deposits \
         just below the reporting threshold between January 8, 2024 and January 12, 2024.\n\n\
         NARRATIVE_BODY:\n{body}{filler}{filler}\n\n\
         NARRATIVE_CONCLUSION:\nThe pattern is consistent with structuring and is reported \
         for further review."
    )
}

/// Generator that replays scripted responses and records every request.
///
/// Narrative responses are consumed in order; the last one repeats. With no
/// narrative scripted it defers to [`TemplateNarrator`]. Planning answers
/// only when a plan was scripted.
#[derive(Default)]
pub struct ScriptedGenerator {
    plan: Option<String>,
    narratives: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, plan: Value) -> Self {
        self.plan = Some(plan.to_string());
        self
    }

    pub fn with_narratives<I, S>(self, narratives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.narratives
            .lock()
            .unwrap()
            .extend(narratives.into_iter().map(Into::into));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, role: GenerationRole) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.role == role)
            .count()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        match request.role {
            GenerationRole::Planning => self
                .plan
                .clone()
                .ok_or_else(|| CollaboratorError::Unsupported("planning".to_string())),
            GenerationRole::Narrative => {
                let scripted = {
                    let mut queue = self.narratives.lock().unwrap();
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                };
                match scripted {
                    Some(text) => Ok(text),
                    None => TemplateNarrator.generate(request).await,
                }
            }
            GenerationRole::Judge => Err(CollaboratorError::Unsupported("judge".to_string())),
        }
    }
}

/// Generator whose every call fails
#[derive(Debug, Default)]
pub struct OfflineGenerator;

#[async_trait::async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(&self, _: &GenerationRequest) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Failed("generator offline".to_string()))
    }
}

/// Judge returning scripted scores in order; the last one repeats
pub struct FixedJudge {
    scores: Mutex<VecDeque<f64>>,
    calls: AtomicUsize,
}

impl FixedJudge {
    pub fn new(scores: impl IntoIterator<Item = f64>) -> Self {
        Self {
            scores: Mutex::new(scores.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(score: f64) -> Self {
        Self::new([score])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QualityJudge for FixedJudge {
    async fn assess(&self, _: &JudgeRequest) -> Result<JudgeAssessment, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let score = {
            let mut scores = self.scores.lock().unwrap();
            if scores.len() > 1 {
                scores.pop_front()
            } else {
                scores.front().copied()
            }
        }
        .unwrap_or(0.0);
        Ok(JudgeAssessment {
            score,
            issues: vec![],
            suggestions: vec!["Reference every transaction by identifier".to_string()],
        })
    }
}

/// Judge whose every call fails
#[derive(Debug, Default)]
pub struct FailingJudge;

#[async_trait::async_trait]
impl QualityJudge for FailingJudge {
    async fn assess(&self, _: &JudgeRequest) -> Result<JudgeAssessment, CollaboratorError> {
        Err(CollaboratorError::Failed("judge offline".to_string()))
    }
}

/// Analyzer returning a fixed report under its name
#[derive(Debug, Clone)]
pub struct StaticAnalyzer {
    pub name: &'static str,
    pub report: AnalyzerReport,
}

impl StaticAnalyzer {
    pub fn new(name: &'static str, report: AnalyzerReport) -> Self {
        Self { name, report }
    }
}

#[async_trait::async_trait]
impl Stage for StaticAnalyzer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contract(&self) -> &'static StageContract {
        &ANALYZER
    }

    async fn run(&self, _: &CaseRecord) -> Result<RecordUpdate, StageError> {
        Ok(RecordUpdate {
            analyzer_reports: Some(BTreeMap::from([(self.name.to_string(), self.report.clone())])),
            ..RecordUpdate::default()
        })
    }
}

/// Analyzer that fails; recoverably (collaborator failure) or fatally
#[derive(Debug, Clone, Copy)]
pub struct FailingAnalyzer {
    pub name: &'static str,
    pub recoverable: bool,
}

#[async_trait::async_trait]
impl Stage for FailingAnalyzer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contract(&self) -> &'static StageContract {
        &ANALYZER
    }

    async fn run(&self, _: &CaseRecord) -> Result<RecordUpdate, StageError> {
        if self.recoverable {
            Err(StageError::ExternalCollaboratorFailure {
                stage: self.name,
                source: CollaboratorError::Failed("lookup service unavailable".to_string()),
            })
        } else {
            Err(StageError::MalformedInput {
                stage: self.name,
                field: argus_record::Field::Redacted,
                reason: "not an object".to_string(),
            })
        }
    }
}

/// Analyzer that panics
#[derive(Debug, Clone, Copy)]
pub struct PanickingAnalyzer {
    pub name: &'static str,
}

#[async_trait::async_trait]
impl Stage for PanickingAnalyzer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contract(&self) -> &'static StageContract {
        &ANALYZER
    }

    async fn run(&self, _: &CaseRecord) -> Result<RecordUpdate, StageError> {
        panic!("analyzer {} blew up", self.name)
    }
}

/// Analyzer that also writes a field outside its contract
#[derive(Debug, Clone, Copy)]
pub struct OverreachingAnalyzer {
    pub name: &'static str,
}

#[async_trait::async_trait]
impl Stage for OverreachingAnalyzer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contract(&self) -> &'static StageContract {
        &ANALYZER
    }

    async fn run(&self, _: &CaseRecord) -> Result<RecordUpdate, StageError> {
        Ok(RecordUpdate {
            analyzer_reports: Some(BTreeMap::from([(
                self.name.to_string(),
                AnalyzerReport::scored(vec![], 0.1),
            )])),
            narrative_draft: Some("written by an analyzer".to_string()),
            ..RecordUpdate::default()
        })
    }
}
