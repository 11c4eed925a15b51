//! Stage graph construction and validation
//!
//! A [`PipelineGraph`] can only be obtained from [`GraphBuilder::build`],
//! which checks that:
//! - every referenced stage is registered and reachable from the entry
//! - every non-terminal stage has exactly one outgoing transition
//! - every router target is registered
//! - the graph is acyclic once the declared loop-back edges are removed

use crate::error::{ExecutionError, GraphError};
use crate::node::StageNode;
use crate::router::Router;
use crate::stage_name::StageName;
use argus_record::CaseRecord;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Outgoing transition of one stage
#[derive(Clone)]
pub enum Transition {
    /// Unconditional edge
    Goto(StageName),
    /// Unconditional edge closing a loop
    LoopBack(StageName),
    /// Conditional edge
    Route(Arc<dyn Router>),
}

impl Transition {
    fn targets(&self) -> Vec<StageName> {
        match self {
            Self::Goto(to) | Self::LoopBack(to) => vec![*to],
            Self::Route(router) => router.targets().to_vec(),
        }
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Goto(to) => f.debug_tuple("Goto").field(to).finish(),
            Self::LoopBack(to) => f.debug_tuple("LoopBack").field(to).finish(),
            Self::Route(router) => f
                .debug_struct("Route")
                .field("router", &router.name())
                .field("targets", &router.targets())
                .finish(),
        }
    }
}

/// Accumulates stages and transitions; all checks run in [`GraphBuilder::build`]
#[derive(Debug)]
pub struct GraphBuilder {
    entry: StageName,
    nodes: BTreeMap<StageName, StageNode>,
    transitions: Vec<(StageName, Transition)>,
    terminals: BTreeSet<StageName>,
    duplicates: Vec<StageName>,
}

impl GraphBuilder {
    /// Start a graph entered at `entry`
    #[must_use]
    pub fn new(entry: StageName) -> Self {
        Self {
            entry,
            nodes: BTreeMap::new(),
            transitions: Vec::new(),
            terminals: BTreeSet::new(),
            duplicates: Vec::new(),
        }
    }

    /// Register the node run for `stage`
    #[must_use]
    pub fn stage(mut self, stage: StageName, node: impl Into<StageNode>) -> Self {
        if self.nodes.insert(stage, node.into()).is_some() {
            self.duplicates.push(stage);
        }
        self
    }

    /// Unconditional edge
    #[must_use]
    pub fn edge(mut self, from: StageName, to: StageName) -> Self {
        self.transitions.push((from, Transition::Goto(to)));
        self
    }

    /// Unconditional edge that is allowed to close a cycle
    #[must_use]
    pub fn loop_back(mut self, from: StageName, to: StageName) -> Self {
        self.transitions.push((from, Transition::LoopBack(to)));
        self
    }

    /// Conditional edge chosen by `router`
    #[must_use]
    pub fn route(mut self, from: StageName, router: Arc<dyn Router>) -> Self {
        self.transitions.push((from, Transition::Route(router)));
        self
    }

    /// Mark `stage` as ending the run
    #[must_use]
    pub fn terminal(mut self, stage: StageName) -> Self {
        self.terminals.insert(stage);
        self
    }

    /// Validate and freeze the graph
    pub fn build(self) -> Result<PipelineGraph, GraphError> {
        if let Some(stage) = self.duplicates.first() {
            return Err(GraphError::DuplicateStage(*stage));
        }
        if !self.nodes.contains_key(&self.entry) {
            return Err(GraphError::MissingEntry(self.entry));
        }
        for (stage, node) in &self.nodes {
            if node.name() != stage.as_str() {
                return Err(GraphError::NameMismatch {
                    stage: *stage,
                    node: node.name(),
                });
            }
        }

        let mut transitions = BTreeMap::new();
        for (from, transition) in self.transitions {
            if !self.nodes.contains_key(&from) {
                return Err(GraphError::UnregisteredStage(from));
            }
            if let Some(to) = transition.targets().into_iter().find(|t| !self.nodes.contains_key(t)) {
                return Err(GraphError::UnregisteredStage(to));
            }
            if self.terminals.contains(&from) {
                return Err(GraphError::TerminalTransition(from));
            }
            if transitions.insert(from, transition).is_some() {
                return Err(GraphError::DuplicateTransition(from));
            }
        }
        if let Some(stage) = self
            .nodes
            .keys()
            .find(|s| !transitions.contains_key(*s) && !self.terminals.contains(*s))
        {
            return Err(GraphError::MissingTransition(*stage));
        }

        let mut full = DiGraphMap::<StageName, ()>::new();
        let mut forward = DiGraphMap::<StageName, ()>::new();
        for stage in self.nodes.keys() {
            full.add_node(*stage);
            forward.add_node(*stage);
        }
        for (from, transition) in &transitions {
            for to in transition.targets() {
                full.add_edge(*from, to, ());
                if !matches!(transition, Transition::LoopBack(_)) {
                    forward.add_edge(*from, to, ());
                }
            }
        }

        let mut reached = BTreeSet::new();
        let mut dfs = Dfs::new(&full, self.entry);
        while let Some(stage) = dfs.next(&full) {
            reached.insert(stage);
        }
        if let Some(stage) = self.nodes.keys().find(|s| !reached.contains(*s)) {
            return Err(GraphError::Unreachable(*stage));
        }

        toposort(&forward, None).map_err(|cycle| GraphError::Cycle(cycle.node_id()))?;

        debug!(
            stages = self.nodes.len(),
            edges = full.edge_count(),
            "pipeline graph validated"
        );

        Ok(PipelineGraph {
            entry: self.entry,
            nodes: self.nodes,
            transitions,
        })
    }
}

/// Validated stage graph
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    entry: StageName,
    nodes: BTreeMap<StageName, StageNode>,
    transitions: BTreeMap<StageName, Transition>,
}

impl PipelineGraph {
    /// First stage of every run
    #[inline]
    #[must_use]
    pub fn entry(&self) -> StageName {
        self.entry
    }

    /// Node registered for `stage`
    pub fn node(&self, stage: StageName) -> Result<&StageNode, ExecutionError> {
        self.nodes
            .get(&stage)
            .ok_or_else(|| ExecutionError::UnknownStageName {
                name: stage.to_string(),
            })
    }

    /// Registered stages, in pipeline order
    pub fn stages(&self) -> impl Iterator<Item = StageName> + '_ {
        self.nodes.keys().copied()
    }

    /// Whether a run ends after `stage`
    #[inline]
    #[must_use]
    pub fn is_terminal(&self, stage: StageName) -> bool {
        !self.transitions.contains_key(&stage)
    }

    /// Successor of `current` given the record after it ran; `None` when
    /// `current` is terminal
    pub fn next(
        &self,
        current: StageName,
        record: &CaseRecord,
    ) -> Result<Option<StageName>, ExecutionError> {
        let next = match self.transitions.get(&current) {
            None => return Ok(None),
            Some(Transition::Goto(to) | Transition::LoopBack(to)) => *to,
            Some(Transition::Route(router)) => {
                let target = router.route(record);
                if !router.targets().contains(&target) || !self.nodes.contains_key(&target) {
                    return Err(ExecutionError::UndeclaredRoute {
                        router: router.name(),
                        target,
                    });
                }
                debug!(router = router.name(), from = %current, to = %target, "routed");
                target
            }
        };
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_record::RecordUpdate;
    use argus_stages::{Stage, StageContract, StageError};

    struct Named(StageName);

    #[async_trait::async_trait]
    impl Stage for Named {
        fn name(&self) -> &'static str {
            self.0.as_str()
        }

        fn contract(&self) -> &'static StageContract {
            self.0.contract()
        }

        async fn run(&self, _: &CaseRecord) -> Result<RecordUpdate, StageError> {
            Ok(RecordUpdate::default())
        }
    }

    fn node(stage: StageName) -> StageNode {
        StageNode::Stage(Arc::new(Named(stage)))
    }

    /// Router that always answers with a stage it never declared
    struct Rogue;

    impl Router for Rogue {
        fn name(&self) -> &'static str {
            "rogue"
        }

        fn targets(&self) -> &'static [StageName] {
            &[StageName::Gate]
        }

        fn route(&self, _: &CaseRecord) -> StageName {
            StageName::Finalize
        }
    }

    fn draft_gate_loop() -> GraphBuilder {
        GraphBuilder::new(StageName::Draft)
            .stage(StageName::Draft, node(StageName::Draft))
            .stage(StageName::Gate, node(StageName::Gate))
            .stage(StageName::Feedback, node(StageName::Feedback))
            .stage(StageName::Finalize, node(StageName::Finalize))
            .edge(StageName::Draft, StageName::Gate)
            .terminal(StageName::Finalize)
    }

    #[test]
    fn loop_back_edge_is_exempt_from_cycle_check() {
        let graph = draft_gate_loop()
            .route(
                StageName::Gate,
                Arc::new(crate::router::QualityGateRouter::new(0.75, 3)),
            )
            .loop_back(StageName::Feedback, StageName::Draft)
            .build()
            .unwrap();
        assert_eq!(graph.entry(), StageName::Draft);
        assert!(graph.is_terminal(StageName::Finalize));
        assert!(!graph.is_terminal(StageName::Feedback));
        assert_eq!(
            graph.next(StageName::Feedback, &CaseRecord::default()).unwrap(),
            Some(StageName::Draft)
        );
    }

    #[test]
    fn undeclared_cycle_is_rejected() {
        let err = draft_gate_loop()
            .route(
                StageName::Gate,
                Arc::new(crate::router::QualityGateRouter::new(0.75, 3)),
            )
            .edge(StageName::Feedback, StageName::Draft)
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::Cycle(_)));
    }

    #[test]
    fn unreachable_stage_is_rejected() {
        let err = GraphBuilder::new(StageName::Draft)
            .stage(StageName::Draft, node(StageName::Draft))
            .stage(StageName::Lookup, node(StageName::Lookup))
            .stage(StageName::Gate, node(StageName::Gate))
            .edge(StageName::Draft, StageName::Gate)
            .edge(StageName::Lookup, StageName::Draft)
            .terminal(StageName::Gate)
            .build()
            .unwrap_err();
        assert_eq!(err, GraphError::Unreachable(StageName::Lookup));
    }

    #[test]
    fn router_targets_must_be_registered() {
        let err = GraphBuilder::new(StageName::Analyze)
            .stage(StageName::Analyze, node(StageName::Analyze))
            .stage(StageName::Draft, node(StageName::Draft))
            .route(StageName::Analyze, Arc::new(crate::router::IntelRouter))
            .terminal(StageName::Draft)
            .build()
            .unwrap_err();
        assert_eq!(err, GraphError::UnregisteredStage(StageName::Lookup));
    }

    #[test]
    fn dead_end_is_rejected() {
        let err = GraphBuilder::new(StageName::Draft)
            .stage(StageName::Draft, node(StageName::Draft))
            .stage(StageName::Gate, node(StageName::Gate))
            .edge(StageName::Draft, StageName::Gate)
            .build()
            .unwrap_err();
        assert_eq!(err, GraphError::MissingTransition(StageName::Gate));
    }

    #[test]
    fn node_names_must_match_their_slot() {
        let err = GraphBuilder::new(StageName::Draft)
            .stage(StageName::Draft, node(StageName::Gate))
            .terminal(StageName::Draft)
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::NameMismatch { stage: StageName::Draft, node: "gate" }));
    }

    #[test]
    fn router_choice_outside_targets_is_fatal() {
        let graph = GraphBuilder::new(StageName::Draft)
            .stage(StageName::Draft, node(StageName::Draft))
            .stage(StageName::Gate, node(StageName::Gate))
            .route(StageName::Draft, Arc::new(Rogue))
            .terminal(StageName::Gate)
            .build()
            .unwrap();
        let err = graph.next(StageName::Draft, &CaseRecord::default()).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::UndeclaredRoute { router: "rogue", target: StageName::Finalize }
        ));
    }
}
