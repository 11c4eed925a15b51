//! Plan -> analyzer names

use crate::registry::AnalyzerRegistry;
use argus_record::ExecutionPlan;
use tracing::{debug, warn};

/// Analyzer names to run for `plan`.
///
/// Plan entries are kept in order when registered, with duplicates and
/// unknown names dropped. When nothing survives, the registered subset of
/// `defaults` is used, then every registered analyzer. The result is empty
/// only for an empty registry.
#[must_use]
pub fn dispatch(
    plan: Option<&ExecutionPlan>,
    registry: &AnalyzerRegistry,
    defaults: &[String],
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in plan.map(|p| p.analyzers.as_slice()).unwrap_or_default() {
        if !registry.contains(name) {
            warn!(analyzer = %name, "plan names an unregistered analyzer, skipping");
        } else if !names.contains(name) {
            names.push(name.clone());
        }
    }
    if !names.is_empty() {
        debug!(analyzers = ?names, "dispatching planned analyzers");
        return names;
    }

    for name in defaults {
        if registry.contains(name) && !names.contains(name) {
            names.push(name.clone());
        }
    }
    if names.is_empty() {
        names = registry.names().into_iter().map(str::to_string).collect();
    }
    debug!(analyzers = ?names, "plan selected nothing runnable, dispatching defaults");
    names
}
