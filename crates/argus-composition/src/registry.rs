//! Analyzer registry
//!
//! Provides [`AnalyzerRegistry`] for resolving dispatched names to stages.

use argus_stages::{all_analyzers, StageRef};
use std::collections::BTreeMap;
use std::fmt;

/// Registered analyzers by name
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    analyzers: BTreeMap<String, StageRef>,
}

impl AnalyzerRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in analyzers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for analyzer in all_analyzers() {
            registry.register(analyzer);
        }
        registry
    }

    /// Register an analyzer under its own name, replacing any previous one
    pub fn register(&mut self, analyzer: StageRef) {
        self.analyzers.insert(analyzer.name().to_string(), analyzer);
    }

    /// Look up an analyzer
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StageRef> {
        self.analyzers.get(name)
    }

    /// Check if an analyzer is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.analyzers.contains_key(name)
    }

    /// Registered names in sorted order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.analyzers.keys().map(String::as_str).collect()
    }

    /// Number of registered analyzers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    /// Check if the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &self.names())
            .finish()
    }
}
