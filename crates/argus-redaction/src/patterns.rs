//! Compiled matchers

use once_cell::sync::Lazy;
use regex::Regex;

/// Keys whose string values are always redacted, compared case-insensitively
pub const SENSITIVE_KEYS: [&str; 7] = [
    "name",
    "address",
    "phone",
    "email",
    "dob",
    "date_of_birth",
    "ssn",
];

static SSN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid SSN pattern"));

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?1?[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").expect("valid PHONE pattern")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid EMAIL pattern")
});

pub(crate) static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[A-Z][A-Z_]*_\d{3,}\]").expect("valid placeholder pattern"));

/// Pattern matchers in application order, paired with their category
pub(crate) fn matchers() -> [(&'static str, &'static Regex); 3] {
    [("SSN", &*SSN), ("PHONE", &*PHONE), ("EMAIL", &*EMAIL)]
}

/// Whether values under `key` are redacted regardless of content
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}
