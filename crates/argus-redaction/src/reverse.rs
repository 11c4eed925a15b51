//! Reversal and re-application of placeholders

use crate::error::RedactionError;
use crate::patterns::PLACEHOLDER;
use argus_record::RedactionMap;
use regex::{Captures, RegexBuilder};
use tracing::warn;

/// Replace every known placeholder in `text` with its original.
///
/// Unknown placeholder-shaped tokens are left as they are, so the function
/// is total, and a second application changes nothing.
#[must_use]
pub fn unmask(text: &str, mapping: &RedactionMap) -> String {
    if mapping.is_empty() {
        return text.to_string();
    }
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            mapping
                .original_for(&caps[0])
                .unwrap_or(&caps[0])
                .to_string()
        })
        .into_owned()
}

/// Placeholder-shaped tokens in `text` that `mapping` cannot resolve,
/// deduplicated in order of first appearance
#[must_use]
pub fn unresolved_placeholders(text: &str, mapping: &RedactionMap) -> Vec<String> {
    let mut unresolved: Vec<String> = Vec::new();
    for token in PLACEHOLDER.find_iter(text).map(|m| m.as_str()) {
        if mapping.original_for(token).is_none() && !unresolved.iter().any(|u| u == token) {
            unresolved.push(token.to_string());
        }
    }
    unresolved
}

/// Like [`unmask`], but fails if any placeholder would survive
pub fn unmask_strict(text: &str, mapping: &RedactionMap) -> Result<String, RedactionError> {
    let placeholders = unresolved_placeholders(text, mapping);
    if placeholders.is_empty() {
        Ok(unmask(text, mapping))
    } else {
        Err(RedactionError::Unresolved { placeholders })
    }
}

/// Compiled size ceiling for the alternation built by [`remask`]
const REMASK_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Replace exact occurrences of known originals with their placeholders.
///
/// Longer originals win over shorter ones that overlap them. Paraphrased or
/// partially edited values are not recognised and pass through in clear.
#[must_use]
pub fn remask(text: &str, mapping: &RedactionMap) -> String {
    remask_within(text, mapping, REMASK_SIZE_LIMIT)
}

fn remask_within(text: &str, mapping: &RedactionMap, size_limit: usize) -> String {
    let mut pairs: Vec<(&str, &str)> = mapping
        .iter()
        .filter(|(_, original)| !original.is_empty())
        .collect();
    if pairs.is_empty() {
        return text.to_string();
    }
    pairs.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

    let alternation = pairs
        .iter()
        .map(|(_, original)| regex::escape(original))
        .collect::<Vec<_>>()
        .join("|");

    match RegexBuilder::new(&alternation).size_limit(size_limit).build() {
        Ok(pattern) => pattern
            .replace_all(text, |caps: &Captures<'_>| {
                mapping
                    .placeholder_for(&caps[0])
                    .unwrap_or(&caps[0])
                    .to_string()
            })
            .into_owned(),
        Err(err) => {
            warn!(error = %err, "remask pattern too large, replacing sequentially");
            pairs
                .iter()
                .fold(text.to_string(), |acc, (placeholder, original)| {
                    acc.replace(original, placeholder)
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn jane_roe_map() -> RedactionMap {
        let (_, mapping) = mask(&json!({
            "subject": {"name": "Jane Roe", "ssn": "123-45-6789"},
            "employer": {"name": "Jane"}
        }));
        mapping
    }

    #[test]
    fn unmask_restores_known_tokens_only() {
        let mapping = jane_roe_map();
        let text = "[NAME_001] and [NAME_099] reviewed";
        assert_eq!(unmask(text, &mapping), "Jane Roe and [NAME_099] reviewed");
        assert_eq!(unresolved_placeholders(text, &mapping), vec!["[NAME_099]"]);
    }

    #[test]
    fn strict_unmask_reports_leftovers() {
        let mapping = jane_roe_map();
        let err = unmask_strict("[SSN_042]", &mapping).unwrap_err();
        assert_eq!(
            err,
            RedactionError::Unresolved {
                placeholders: vec!["[SSN_042]".to_string()]
            }
        );
        assert_eq!(
            unmask_strict("[SSN_002]", &mapping).unwrap(),
            "123-45-6789"
        );
    }

    #[test]
    fn remask_prefers_longest_original() {
        let mapping = jane_roe_map();
        let placeholder = mapping.placeholder_for("Jane Roe").unwrap().to_string();
        let short = mapping.placeholder_for("Jane").unwrap().to_string();
        let edited = "Jane Roe wired funds; Jane signed.";
        assert_eq!(
            remask(edited, &mapping),
            format!("{placeholder} wired funds; {short} signed.")
        );
    }

    #[test]
    fn remask_then_unmask_is_identity_on_exact_values() {
        let mapping = jane_roe_map();
        let edited = "Subject Jane Roe (SSN 123-45-6789) made 2 deposits.";
        let remasked = remask(edited, &mapping);
        assert!(!remasked.contains("Jane Roe"));
        assert_eq!(unmask(&remasked, &mapping), edited);
    }

    #[test]
    fn paraphrased_values_pass_through() {
        let mapping = jane_roe_map();
        assert_eq!(remask("J. Roe", &mapping), "J. Roe");
    }

    #[test]
    fn oversized_pattern_falls_back_to_sequential_replacement() {
        let mapping = jane_roe_map();
        let edited = "Jane Roe wired funds; Jane signed. SSN 123-45-6789.";
        let sequential = remask_within(edited, &mapping, 1);
        assert_eq!(sequential, remask(edited, &mapping));
        assert!(!sequential.contains("Jane"));
        assert_eq!(unmask(&sequential, &mapping), edited);
    }

    proptest! {
        #[test]
        fn prop_unmask_is_idempotent(text in "[A-Za-z \\[\\]_0-9]{0,40}") {
            let mapping = jane_roe_map();
            let once = unmask(&text, &mapping);
            prop_assert_eq!(unmask(&once, &mapping), once);
        }
    }
}
