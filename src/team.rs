use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::asset::{AssetNode, TreeFile};
use crate::attributes::{ChainStats, GraphStats, OriginPolicy, derive_attributes};
use crate::error::Result;
use crate::graph::{AcquisitionGraph, NodeId, RejectedTree, normalize, normalize_forest};
use crate::roster::RosterOrderTable;
use crate::trace::PathTracer;

/// A team's combined acquisition graph with its derived attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamGraph {
    pub team: String,
    #[serde(flatten)]
    pub graph: AcquisitionGraph,
    pub stats: GraphStats,
    pub trade_partners: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedTree>,
}

impl TeamGraph {
    /// Merges every stored tree of a team. Malformed trees are left out and
    /// listed in `rejected`.
    pub fn build(
        team: &str,
        files: &[TreeFile],
        roster: &RosterOrderTable,
        policy: OriginPolicy,
    ) -> Self {
        let trees: Vec<AssetNode> = files.iter().map(|file| file.tree.clone()).collect();
        let forest = normalize_forest(&trees);
        let graph = derive_attributes(forest.graph, roster, team, policy);
        let stats = GraphStats::compute(&graph, files.iter().filter_map(|file| file.meta.origin_year));
        let trade_partners = PathTracer::new(&graph).trade_partners();

        info!(
            team,
            roster = stats.roster_count,
            nodes = stats.node_count,
            edges = stats.edge_count,
            rejected = forest.rejected.len(),
            "built team graph"
        );

        TeamGraph {
            team: team.to_string(),
            graph,
            stats,
            trade_partners,
            rejected: forest.rejected,
        }
    }

    pub fn chain_stats(&self, root: NodeId) -> ChainStats {
        ChainStats::for_chain(&self.graph, root, &self.team)
    }
}

/// One roster player's chain on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerChain {
    pub team: String,
    pub player: String,
    #[serde(flatten)]
    pub graph: AcquisitionGraph,
    pub stats: ChainStats,
}

impl PlayerChain {
    /// A malformed tree fails here rather than being skipped: there is
    /// nothing else to show.
    pub fn build(file: &TreeFile, roster: &RosterOrderTable, policy: OriginPolicy) -> Result<Self> {
        let team = file.meta.team.as_str();
        let graph = derive_attributes(
            normalize(std::slice::from_ref(&file.tree))?,
            roster,
            team,
            policy,
        );
        let stats = graph
            .roots
            .first()
            .map(|root| ChainStats::for_chain(&graph, *root, team))
            .unwrap_or_default();

        Ok(PlayerChain {
            team: team.to_string(),
            player: file.meta.player.clone(),
            graph,
            stats,
        })
    }

    pub fn root(&self) -> Option<NodeId> {
        self.graph.roots.first().copied()
    }
}
