//! Language in communications and transaction notes

use super::ids;
use crate::case::CaseFile;
use argus_record::{Finding, Severity};

/// Keyword families scanned for, in report order
pub const SUSPICIOUS_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "urgency",
        &["urgent", "asap", "immediately", "hurry", "rush", "fast", "quick"],
    ),
    (
        "secrecy",
        &["confidential", "secret", "don't tell", "between us", "private", "no one else"],
    ),
    (
        "cash_related",
        &["cash", "withdraw", "untraceable", "off the books", "under the table"],
    ),
    (
        "structuring",
        &["split", "break up", "smaller amounts", "below limit", "avoid reporting"],
    ),
    (
        "offshore",
        &["offshore", "overseas account", "foreign account", "transfer abroad", "shell company"],
    ),
    (
        "pressure",
        &["must do today", "can't wait", "deadline", "no questions", "just do it"],
    ),
];

const VAGUE_DESCRIPTION_CHARS: usize = 15;
const VAGUE_AMOUNT: f64 = 5_000.0;

/// Suspicious phrasing and terse high-value descriptions
#[derive(Debug, Clone, Copy, Default)]
pub struct TextContent;

impl TextContent {
    /// Registered name
    pub const NAME: &'static str = "text_content";
    /// Score contributed per finding
    pub const WEIGHT: f64 = 0.25;

    /// Findings over the redacted case
    #[must_use]
    pub fn findings(case: &CaseFile) -> Vec<Finding> {
        let corpus = case
            .flagged_communications
            .iter()
            .map(|c| c.content_snippet.as_str())
            .chain(
                case.transactions
                    .iter()
                    .filter_map(|t| t.description.as_deref()),
            )
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let mut findings = Vec::new();
        for (family, keywords) in SUSPICIOUS_KEYWORDS {
            let matched: Vec<String> = keywords
                .iter()
                .filter(|k| corpus.contains(**k))
                .map(|k| (*k).to_string())
                .collect();
            if matched.is_empty() {
                continue;
            }
            let severity = if matches!(*family, "structuring" | "secrecy") {
                Severity::High
            } else {
                Severity::Medium
            };
            findings.push(Finding::new(
                format!("suspicious_language_{family}"),
                severity,
                matched.len(),
                format!("Detected {family} language: {}", matched.join(", ")),
                matched,
            ));
        }

        let vague: Vec<_> = case
            .transactions
            .iter()
            .filter(|t| {
                t.description
                    .as_deref()
                    .is_some_and(|d| !d.is_empty() && d.chars().count() < VAGUE_DESCRIPTION_CHARS)
                    && t.amount > VAGUE_AMOUNT
            })
            .collect();
        if !vague.is_empty() {
            findings.push(Finding::new(
                "vague_high_value_descriptions",
                Severity::Medium,
                vague.len(),
                format!(
                    "{} high-value transactions with unusually brief descriptions, potential coded communication",
                    vague.len()
                ),
                ids(vague),
            ));
        }

        findings
    }
}

analyzer_stage!(TextContent);
