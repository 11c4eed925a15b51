//! Jurisdiction exposure

use crate::case::{format_amount, CaseFile};
use argus_record::{Finding, Severity};

/// Code, name, designation
type Jurisdiction = (&'static str, &'static str, &'static str);

/// Blacklisted or sanctioned jurisdictions
pub const HIGH_RISK_COUNTRIES: &[Jurisdiction] = &[
    ("AF", "Afghanistan", "FATF Black List"),
    ("MM", "Myanmar", "FATF Black List"),
    ("KP", "North Korea", "FATF Black List"),
    ("IR", "Iran", "FATF Black List"),
    ("SY", "Syria", "OFAC Sanctioned"),
];

/// Grey-listed jurisdictions and tax havens
pub const MONITORED_COUNTRIES: &[Jurisdiction] = &[
    ("BZ", "Belize", "FATF Grey List"),
    ("PA", "Panama", "FATF Grey List / Tax Haven"),
    ("VU", "Vanuatu", "FATF Grey List"),
    ("KY", "Cayman Islands", "Tax Haven"),
    ("VG", "British Virgin Islands", "Tax Haven"),
    ("JE", "Jersey", "Tax Haven"),
    ("GG", "Guernsey", "Tax Haven"),
    ("IM", "Isle of Man", "Tax Haven"),
];

#[derive(Default)]
struct Flow {
    volume: f64,
    count: usize,
}

fn lookup(code: &str) -> Option<&'static Jurisdiction> {
    HIGH_RISK_COUNTRIES
        .iter()
        .chain(MONITORED_COUNTRIES)
        .find(|(c, _, _)| *c == code)
}

/// Flows through listed jurisdictions and entities registered there
#[derive(Debug, Clone, Copy, Default)]
pub struct CountryRisk;

impl CountryRisk {
    /// Registered name
    pub const NAME: &'static str = "country_risk";
    /// Score contributed per finding
    pub const WEIGHT: f64 = 0.35;

    /// Findings over the redacted case
    #[must_use]
    pub fn findings(case: &CaseFile) -> Vec<Finding> {
        let mut flows: Vec<(&str, Flow)> = Vec::new();
        for t in &case.transactions {
            for code in t.countries() {
                let slot = match flows.iter().position(|(c, _)| *c == code) {
                    Some(i) => i,
                    None => {
                        flows.push((code, Flow::default()));
                        flows.len() - 1
                    }
                };
                flows[slot].1.volume += t.amount;
                flows[slot].1.count += 1;
            }
        }

        let mut findings = Vec::new();
        let lists = [
            (HIGH_RISK_COUNTRIES, "high_risk_jurisdiction", Severity::Critical),
            (MONITORED_COUNTRIES, "monitored_jurisdiction", Severity::High),
        ];
        for (list, pattern, severity) in lists {
            for (code, name, designation) in list {
                if let Some((_, flow)) = flows.iter().find(|(c, _)| c == code) {
                    findings.push(Finding::new(
                        pattern,
                        severity,
                        flow.count,
                        format!(
                            "Transactions involving {name} ({code}), {designation}: {} across {} transactions",
                            format_amount(flow.volume),
                            flow.count
                        ),
                        vec![(*code).to_string()],
                    ));
                }
            }
        }

        for entity in &case.related_entities {
            let code = entity.jurisdiction.as_deref().unwrap_or_default();
            if let Some((_, name, designation)) = lookup(code) {
                let entity_name = entity.entity_name.clone().unwrap_or_default();
                findings.push(Finding::new(
                    "entity_jurisdiction_risk",
                    Severity::High,
                    1,
                    format!(
                        "Related entity '{entity_name}' registered in {name} ({code}), {designation}"
                    ),
                    vec![entity_name, code.to_string()],
                ));
            }
        }

        findings
    }
}

analyzer_stage!(CountryRisk);
