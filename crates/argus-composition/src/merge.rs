//! Key-wise union of analyzer updates

use crate::error::CompositionError;
use argus_record::{AnalyzerReport, CaseRecord, RecordUpdate};
use std::collections::BTreeMap;

/// Fold analyzer updates through the record's strict merge policy.
///
/// Reports union by key; a key produced twice is a consistency error. The
/// result does not depend on update order.
pub fn merge<I>(updates: I) -> Result<BTreeMap<String, AnalyzerReport>, CompositionError>
where
    I: IntoIterator<Item = RecordUpdate>,
{
    let mut scratch = CaseRecord::default();
    for update in updates {
        scratch.apply(update)?;
    }
    Ok(scratch.analyzer_reports.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_record::Field;

    fn update(name: &str, score: f64) -> RecordUpdate {
        RecordUpdate {
            analyzer_reports: Some(BTreeMap::from([(
                name.to_string(),
                AnalyzerReport {
                    findings: Some(vec![]),
                    risk_score: Some(score),
                },
            )])),
            ..RecordUpdate::default()
        }
    }

    #[test]
    fn disjoint_keys_union() {
        let merged = merge([update("a", 0.1), update("b", 0.2)]).unwrap();
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn colliding_keys_are_inconsistent() {
        let err = merge([update("a", 0.1), update("a", 0.1)]).unwrap_err();
        assert!(err.is_consistency());
        assert!(matches!(
            err,
            CompositionError::Consistency { field: Field::AnalyzerReports, ref key } if key == "a"
        ));
    }

    #[test]
    fn nothing_merges_to_empty() {
        assert!(merge(Vec::new()).unwrap().is_empty());
    }
}
