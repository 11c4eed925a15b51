//! Redaction errors

/// Failure to fully reverse a redaction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedactionError {
    /// Placeholder-shaped tokens with no entry in the map
    #[error("unresolved placeholders: {}", placeholders.join(", "))]
    Unresolved {
        /// Tokens left in the text
        placeholders: Vec<String>,
    },
}
