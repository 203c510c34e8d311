use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{AcquisitionGraph, GraphNode, NodeId};
use crate::roster::RosterOrderTable;
use crate::trace::PathTracer;
use crate::utils::year_of;

/// How origins are chosen when the roster graph has several disconnected
/// components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginPolicy {
    /// One origin for the whole roster: the earliest dated reachable node.
    #[default]
    Global,
    /// One origin per weakly connected component.
    PerComponent,
}

impl fmt::Display for OriginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginPolicy::Global => write!(f, "global"),
            OriginPolicy::PerComponent => write!(f, "per-component"),
        }
    }
}

impl FromStr for OriginPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(OriginPolicy::Global),
            "per-component" | "component" => Ok(OriginPolicy::PerComponent),
            other => Err(format!(
                "unknown origin policy '{other}' (expected global or per-component)"
            )),
        }
    }
}

/// Attaches origin, homegrown and roster-order attributes.
///
/// Previously derived values are cleared first, so deriving twice with the
/// same inputs gives the same graph.
pub fn derive_attributes(
    mut graph: AcquisitionGraph,
    roster: &RosterOrderTable,
    team: &str,
    policy: OriginPolicy,
) -> AcquisitionGraph {
    for node in &mut graph.nodes {
        node.is_origin = false;
        node.is_homegrown = false;
        node.roster_order = None;
        node.roster_category = None;
    }
    for edge in &mut graph.edges {
        edge.animated = false;
    }

    let origins = select_origins(&graph, policy);
    for id in &origins {
        if let Some(node) = graph.nodes.get_mut(id.index()) {
            node.is_origin = true;
        }
    }
    for edge in &mut graph.edges {
        edge.animated = origins.contains(&edge.source);
    }
    if origins.is_empty() {
        debug!("no dated node reachable from the roster, graph has no origin");
    }

    let roots = graph.roots.clone();
    for root in roots {
        let Some(node) = graph.nodes.get_mut(root.index()) else {
            continue;
        };
        let entry = roster.lookup(team, &node.name);
        node.roster_order = Some(entry.order);
        node.roster_category = Some(entry.category);
        node.is_homegrown = is_homegrown(node);
    }

    debug!(
        team,
        origins = origins.len(),
        homegrown = graph.nodes.iter().filter(|node| node.is_homegrown).count(),
        "derived graph attributes"
    );
    graph
}

/// Drafted by the team, or signed directly by it with the source record
/// flagging that first stint.
fn is_homegrown(node: &GraphNode) -> bool {
    match node.acquisition_type {
        Some(acquisition) if acquisition.is_draft() => true,
        Some(acquisition) if acquisition.is_direct_signing() => {
            node.declared.homegrown || node.declared.origin
        }
        _ => false,
    }
}

fn select_origins(graph: &AcquisitionGraph, policy: OriginPolicy) -> BTreeSet<NodeId> {
    let tracer = PathTracer::new(graph);
    let mut reachable = BTreeSet::new();
    for root in &graph.roots {
        reachable.extend(tracer.ancestors_of(*root));
    }

    let dated = reachable.iter().filter_map(|id| {
        let node = graph.node(*id)?;
        Some((node.parsed_date()?, *id))
    });

    match policy {
        OriginPolicy::Global => dated.min().map(|(_, id)| id).into_iter().collect(),
        OriginPolicy::PerComponent => {
            let mut components = Components::new(graph.nodes.len());
            for edge in &graph.edges {
                if reachable.contains(&edge.source) && reachable.contains(&edge.target) {
                    components.union(edge.source.index(), edge.target.index());
                }
            }

            let mut earliest: BTreeMap<usize, (NaiveDate, NodeId)> = BTreeMap::new();
            for candidate in dated {
                let component = components.find(candidate.1.index());
                earliest
                    .entry(component)
                    .and_modify(|current| *current = (*current).min(candidate))
                    .or_insert(candidate);
            }
            earliest.into_values().map(|(_, id)| id).collect()
        }
    }
}

/// Disjoint sets over node indices.
struct Components {
    parent: Vec<usize>,
}

impl Components {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            self.parent[index] = self.parent[self.parent[index]];
            index = self.parent[index];
        }
        index
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a.max(b)] = a.min(b);
        }
    }
}

/// Summary numbers shown alongside a team graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub roster_count: usize,
    pub homegrown_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub origin_count: usize,
    pub trade_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_origin_year: Option<i32>,
}

impl GraphStats {
    /// `meta_origin_years` are the `originYear` values from the tree files;
    /// without any, the earliest origin node's own year is used.
    pub fn compute(graph: &AcquisitionGraph, meta_origin_years: impl IntoIterator<Item = i32>) -> Self {
        let earliest_origin_year = meta_origin_years.into_iter().min().or_else(|| {
            graph
                .nodes
                .iter()
                .filter(|node| node.is_origin)
                .filter_map(|node| year_of(node.date.as_deref()))
                .min()
        });

        GraphStats {
            roster_count: graph.roots.len(),
            homegrown_count: graph.roster_nodes().filter(|node| node.is_homegrown).count(),
            node_count: graph.nodes.len(),
            edge_count: graph.edges.len(),
            origin_count: graph.nodes.iter().filter(|node| node.is_origin).count(),
            trade_count: graph
                .nodes
                .iter()
                .filter(|node| node.acquisition_type == Some(crate::asset::AcquisitionType::Trade))
                .count(),
            earliest_origin_year,
        }
    }
}

/// Teams and trades involved in one roster player's chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    pub teams: BTreeSet<String>,
    pub trades: usize,
}

impl ChainStats {
    pub fn for_chain(graph: &AcquisitionGraph, root: NodeId, team: &str) -> Self {
        let chain = PathTracer::new(graph).ancestors_of(root);
        let mut stats = ChainStats::default();
        if chain.is_empty() {
            return stats;
        }
        stats.teams.insert(team.to_string());

        for node in chain.iter().filter_map(|id| graph.node(*id)) {
            stats.teams.extend(node.trade_partner.iter().cloned());
            stats.teams.extend(node.current_team.iter().cloned());
            if node.acquisition_type.is_some_and(|acquisition| acquisition.is_trade()) {
                stats.trades += 1;
            }
        }
        stats
    }
}
