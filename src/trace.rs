use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::graph::{AcquisitionGraph, NodeId};

/// Answers ancestry questions over one graph.
///
/// Both adjacency maps are built once in [`PathTracer::new`]; every query is
/// then a single O(V + E) walk.
pub struct PathTracer<'a> {
    graph: &'a AcquisitionGraph,
    sources_by_target: Vec<Vec<NodeId>>,
    targets_by_source: Vec<Vec<NodeId>>,
}

impl<'a> PathTracer<'a> {
    pub fn new(graph: &'a AcquisitionGraph) -> Self {
        Self {
            graph,
            sources_by_target: graph.sources_by_target(),
            targets_by_source: graph.targets_by_source(),
        }
    }

    /// Parses a `node-<n>` id and checks it belongs to this graph.
    pub fn resolve(&self, raw: &str) -> Result<NodeId> {
        let id: NodeId = raw.parse()?;
        if self.graph.contains(id) {
            Ok(id)
        } else {
            Err(EngineError::UnknownNode(raw.to_string()))
        }
    }

    /// Every asset that fed into `start`, including `start` itself.
    /// An id outside the graph yields an empty set.
    pub fn ancestors_of(&self, start: NodeId) -> BTreeSet<NodeId> {
        let mut closure = BTreeSet::new();
        if !self.graph.contains(start) {
            return closure;
        }

        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            if !closure.insert(current) {
                continue;
            }
            if let Some(sources) = self.sources_by_target.get(current.index()) {
                queue.extend(sources.iter().filter(|id| !closure.contains(*id)));
            }
        }
        closure
    }

    /// Full chains of every roster player whose history involves a trade
    /// with `partner`.
    pub fn team_related_chains(&self, partner: &str) -> BTreeSet<NodeId> {
        let mut related = BTreeSet::new();
        let mut chain_ends = BTreeSet::new();

        for node in self
            .graph
            .nodes
            .iter()
            .filter(|node| node.trade_partner.as_deref() == Some(partner))
        {
            chain_ends.extend(self.receivers_of(node.id));
        }

        for end in chain_ends {
            related.extend(self.ancestors_of(end));
        }
        related
    }

    /// Walks forward from `start` and returns where the walk stops: roster
    /// players, or nodes nobody received.
    fn receivers_of(&self, start: NodeId) -> BTreeSet<NodeId> {
        let mut ends = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.graph.node(current) else {
                continue;
            };
            let targets = self
                .targets_by_source
                .get(current.index())
                .map(Vec::as_slice)
                .unwrap_or_default();
            if node.is_roster_player || targets.is_empty() {
                ends.insert(current);
            } else {
                queue.extend(targets.iter().copied());
            }
        }
        ends
    }

    /// Distinct partner teams that appear anywhere in the graph.
    pub fn trade_partners(&self) -> BTreeSet<String> {
        self.graph
            .nodes
            .iter()
            .filter_map(|node| node.trade_partner.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHighlight {
    pub id: NodeId,
    pub highlighted: bool,
    pub dimmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeHighlight {
    pub id: String,
    pub in_path: bool,
    pub dimmed: bool,
    pub emphasized: bool,
}

/// Render flags for a traced selection. An empty selection leaves the
/// whole graph undimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub selection: BTreeSet<NodeId>,
    pub nodes: Vec<NodeHighlight>,
    pub edges: Vec<EdgeHighlight>,
}

impl Highlight {
    pub fn from_selection(graph: &AcquisitionGraph, selection: BTreeSet<NodeId>) -> Self {
        let active = !selection.is_empty();

        let nodes = graph
            .nodes
            .iter()
            .map(|node| {
                let highlighted = selection.contains(&node.id);
                NodeHighlight {
                    id: node.id,
                    highlighted,
                    dimmed: active && !highlighted,
                }
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| {
                let in_path = selection.contains(&edge.source) && selection.contains(&edge.target);
                EdgeHighlight {
                    id: edge.id.clone(),
                    in_path,
                    dimmed: active && !in_path,
                    emphasized: edge.animated && (!active || in_path),
                }
            })
            .collect();

        Highlight {
            selection,
            nodes,
            edges,
        }
    }

    pub fn is_highlighted(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AcquisitionType as Acq, AssetNode};
    use crate::attributes::{OriginPolicy, derive_attributes};
    use crate::graph::normalize;
    use crate::roster::RosterOrderTable;

    fn forest() -> AcquisitionGraph {
        let shared = || {
            AssetNode::pick("2021 1st Round")
                .acquired(Acq::Trade, "2019-06-20")
                .via("MEM")
        };
        let trees = [
            AssetNode::player("Jayson Tatum")
                .acquired(Acq::Draft, "2017-06-22")
                .giving_up([AssetNode::pick("BKN 2017 1st")
                    .acquired(Acq::Trade, "2013-07-12")
                    .via("BKN")]),
            AssetNode::player("Player A")
                .acquired(Acq::Trade, "2021-08-01")
                .giving_up([shared()]),
            AssetNode::player("Player B")
                .acquired(Acq::Trade, "2022-02-01")
                .giving_up([shared()]),
            AssetNode::player("Loner").acquired(Acq::FreeAgent, "2023-07-01"),
        ];
        derive_attributes(
            normalize(&trees).unwrap(),
            &RosterOrderTable::new(),
            "BOS",
            OriginPolicy::Global,
        )
    }

    fn names(graph: &AcquisitionGraph, ids: &BTreeSet<NodeId>) -> BTreeSet<String> {
        ids.iter()
            .filter_map(|id| graph.node(*id))
            .map(|node| node.name.clone())
            .collect()
    }

    #[test]
    fn ancestors_of_tatum_is_tatum_and_the_pick() {
        let graph = forest();
        let tracer = PathTracer::new(&graph);
        let tatum = graph.find_by_name("Jayson Tatum").unwrap().id;

        assert_eq!(
            names(&graph, &tracer.ancestors_of(tatum)),
            BTreeSet::from(["Jayson Tatum".to_string(), "BKN 2017 1st".to_string()])
        );
    }

    #[test]
    fn ancestor_closure_contains_start_and_is_closed_under_edges() {
        let graph = forest();
        let tracer = PathTracer::new(&graph);

        for node in &graph.nodes {
            let closure = tracer.ancestors_of(node.id);
            assert!(closure.contains(&node.id));
            for edge in &graph.edges {
                if closure.contains(&edge.target) {
                    assert!(closure.contains(&edge.source));
                }
            }
        }
    }

    #[test]
    fn unknown_ids_trace_to_nothing() {
        let graph = forest();
        let tracer = PathTracer::new(&graph);
        assert!(tracer.ancestors_of("node-999".parse().unwrap()).is_empty());
        assert!(matches!(tracer.resolve("node-999"), Err(EngineError::UnknownNode(_))));
        assert!(tracer.resolve("node-0").is_ok());
    }

    #[test]
    fn team_chains_follow_shared_nodes_to_every_receiver() {
        let graph = forest();
        let tracer = PathTracer::new(&graph);

        assert_eq!(
            names(&graph, &tracer.team_related_chains("MEM")),
            BTreeSet::from([
                "2021 1st Round".to_string(),
                "Player A".to_string(),
                "Player B".to_string(),
            ])
        );
        assert!(tracer.team_related_chains("LAL").is_empty());
    }

    #[test]
    fn trade_partners_are_distinct_and_sorted() {
        let graph = forest();
        let partners: Vec<_> = PathTracer::new(&graph).trade_partners().into_iter().collect();
        assert_eq!(partners, vec!["BKN".to_string(), "MEM".to_string()]);
    }

    #[test]
    fn highlight_dims_everything_outside_the_selection() {
        let graph = forest();
        let tracer = PathTracer::new(&graph);
        let tatum = graph.find_by_name("Jayson Tatum").unwrap().id;
        let highlight = Highlight::from_selection(&graph, tracer.ancestors_of(tatum));

        let loner = graph.find_by_name("Loner").unwrap().id;
        assert!(highlight.is_highlighted(tatum));
        assert!(highlight.nodes[loner.index()].dimmed);

        let in_path: Vec<_> = highlight.edges.iter().filter(|edge| edge.in_path).collect();
        assert_eq!(in_path.len(), 1);
        assert!(in_path[0].emphasized);
        assert!(highlight.edges.iter().filter(|edge| !edge.in_path).all(|edge| edge.dimmed));
    }

    #[test]
    fn empty_selection_dims_nothing() {
        let graph = forest();
        let highlight = Highlight::from_selection(&graph, BTreeSet::new());
        assert!(highlight.nodes.iter().all(|node| !node.dimmed && !node.highlighted));
        assert!(highlight.edges.iter().all(|edge| !edge.dimmed));
    }
}
