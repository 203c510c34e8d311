use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::asset::{AcquisitionType, AssetNode, RawAssetType};
use crate::error::{EngineError, Result};
use crate::roster::RosterCategory;
use crate::utils::{UNKNOWN_DATE, parse_asset_date};

/// Opaque node handle. Serialized as `node-<n>`; `n` follows depth-first
/// discovery order, so the same forest always yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self> {
        raw.strip_prefix("node-")
            .and_then(|n| n.parse::<u32>().ok())
            .map(NodeId)
            .ok_or_else(|| EngineError::UnknownNode(raw.to_string()))
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for NodeId {
    type Error = EngineError;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

/// `(name, date)` identity of a real-world asset. A missing date keys as
/// `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DedupKey {
    pub name: String,
    pub date: String,
}

impl DedupKey {
    pub fn of(asset: &AssetNode) -> Self {
        DedupKey {
            name: asset.name.clone().unwrap_or_default(),
            date: asset
                .date
                .clone()
                .filter(|date| !date.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.name, self.date)
    }
}

impl From<DedupKey> for String {
    fn from(key: DedupKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for DedupKey {
    type Error = String;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        let (name, date) = raw
            .rsplit_once("::")
            .ok_or_else(|| format!("dedup key '{raw}' is missing a '::' separator"))?;
        Ok(DedupKey {
            name: name.to_string(),
            date: date.to_string(),
        })
    }
}

/// Closed set of asset kinds; each variant only carries what applies to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum AssetKind {
    Player {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        draft_pick: Option<u32>,
    },
    Pick {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        draft_pick: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        became_player: Option<String>,
    },
    Cash,
    Other,
}

impl AssetKind {
    fn from_asset(asset: &AssetNode) -> Self {
        match asset.asset_type {
            RawAssetType::Player => AssetKind::Player {
                draft_pick: asset.draft_pick,
            },
            RawAssetType::Pick => AssetKind::Pick {
                draft_pick: asset.draft_pick,
                became_player: asset.became_player.clone(),
            },
            RawAssetType::Cash => AssetKind::Cash,
            RawAssetType::Other => AssetKind::Other,
        }
    }

    pub fn raw_type(&self) -> RawAssetType {
        match self {
            AssetKind::Player { .. } => RawAssetType::Player,
            AssetKind::Pick { .. } => RawAssetType::Pick,
            AssetKind::Cash => RawAssetType::Cash,
            AssetKind::Other => RawAssetType::Other,
        }
    }

    pub fn draft_pick(&self) -> Option<u32> {
        match self {
            AssetKind::Player { draft_pick } | AssetKind::Pick { draft_pick, .. } => *draft_pick,
            AssetKind::Cash | AssetKind::Other => None,
        }
    }
}

/// Flags the source record declared itself; kept so derivation can honour
/// them without reaching back into the raw trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclaredFlags {
    pub origin: bool,
    pub homegrown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub dedup_key: DedupKey,
    pub name: String,
    #[serde(flatten)]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_type: Option<AcquisitionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_partner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip)]
    pub declared: DeclaredFlags,
    #[serde(default)]
    pub is_origin: bool,
    #[serde(default)]
    pub is_roster_player: bool,
    #[serde(default)]
    pub is_homegrown: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster_category: Option<RosterCategory>,
}

impl GraphNode {
    fn from_asset(id: NodeId, dedup_key: DedupKey, asset: &AssetNode) -> Self {
        GraphNode {
            id,
            dedup_key,
            name: asset.name.clone().unwrap_or_default(),
            kind: AssetKind::from_asset(asset),
            acquisition_type: asset.acquisition_type,
            date: asset.date.clone(),
            trade_partner: asset.trade_partner.clone(),
            draft_round: asset.draft_round,
            trade_description: asset.trade_description.clone(),
            current_team: asset.current_team.clone(),
            note: asset.note.clone(),
            declared: DeclaredFlags {
                origin: asset.is_origin.unwrap_or(false),
                homegrown: asset.is_homegrown.unwrap_or(false),
            },
            is_origin: false,
            is_roster_player: false,
            is_homegrown: false,
            roster_order: None,
            roster_category: None,
        }
    }

    /// Parsed transaction date; `None` orders after every dated node.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_asset_date(self.date.as_deref())
    }

    /// Rebuilds the raw record (without children) this node was created from.
    fn to_asset(&self) -> AssetNode {
        let became_player = match &self.kind {
            AssetKind::Pick { became_player, .. } => became_player.clone(),
            _ => None,
        };
        AssetNode {
            asset_type: self.kind.raw_type(),
            name: Some(self.name.clone()),
            acquisition_type: self.acquisition_type,
            date: self.date.clone(),
            trade_partner: self.trade_partner.clone(),
            draft_pick: self.kind.draft_pick(),
            draft_round: self.draft_round,
            became_player,
            trade_description: self.trade_description.clone(),
            current_team: self.current_team.clone(),
            note: self.note.clone(),
            is_origin: self.declared.origin.then_some(true),
            is_homegrown: self.declared.homegrown.then_some(true),
            assets_given_up: Vec::new(),
        }
    }
}

/// Directed from the surrendered asset (`source`) to the node that received
/// it (`target`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub animated: bool,
}

impl GraphEdge {
    fn new(source: NodeId, target: NodeId) -> Self {
        GraphEdge {
            id: format!("edge-{source}-{target}"),
            source,
            target,
            animated: false,
        }
    }
}

/// The deduplicated acquisition graph for one roster.
///
/// `nodes[i].id` is always `node-i`. `roots` lists the roster players in the
/// order their trees were supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub roots: Vec<NodeId>,
}

impl AcquisitionGraph {
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index()).filter(|node| node.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn roster_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.roots.iter().filter_map(|id| self.node(*id))
    }

    pub fn origin(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.is_origin)
    }

    /// `target -> [sources]` in edge order: the assets given up for each node.
    pub fn sources_by_target(&self) -> Vec<Vec<NodeId>> {
        let mut map = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            if let Some(slot) = map.get_mut(edge.target.index()) {
                slot.push(edge.source);
            }
        }
        map
    }

    /// `source -> [targets]` in edge order: who received each asset.
    pub fn targets_by_source(&self) -> Vec<Vec<NodeId>> {
        let mut map = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            if let Some(slot) = map.get_mut(edge.source.index()) {
                slot.push(edge.target);
            }
        }
        map
    }

    /// Stable hash of the node and edge sets, used to invalidate cached layouts.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for node in &self.nodes {
            node.dedup_key.hash(&mut hasher);
        }
        for edge in &self.edges {
            edge.source.hash(&mut hasher);
            edge.target.hash(&mut hasher);
        }
        self.roots.hash(&mut hasher);
        hasher.finish()
    }

    /// Expands the graph back into one transaction tree per roster player.
    ///
    /// Shared assets are repeated under every acquirer, which is how the
    /// source data records them.
    pub fn to_trees(&self) -> Vec<AssetNode> {
        let sources = self.sources_by_target();
        let mut on_path = HashSet::new();
        self.roots
            .iter()
            .filter_map(|root| self.rebuild(*root, &sources, &mut on_path))
            .collect()
    }

    fn rebuild(
        &self,
        id: NodeId,
        sources: &[Vec<NodeId>],
        on_path: &mut HashSet<NodeId>,
    ) -> Option<AssetNode> {
        let node = self.node(id)?;
        if !on_path.insert(id) {
            return None;
        }
        let mut asset = node.to_asset();
        if let Some(children) = sources.get(id.index()) {
            asset.assets_given_up = children
                .iter()
                .filter_map(|child| self.rebuild(*child, sources, on_path))
                .collect();
        }
        on_path.remove(&id);
        Some(asset)
    }
}

/// A tree left out of a lenient normalization pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedTree {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedForest {
    pub graph: AcquisitionGraph,
    pub rejected: Vec<RejectedTree>,
}

/// Normalizes a forest of per-player trees into one deduplicated graph.
///
/// Every tree is validated first; any malformed record fails the call and
/// nothing is ingested.
pub fn normalize(trees: &[AssetNode]) -> Result<AcquisitionGraph> {
    for (index, tree) in trees.iter().enumerate() {
        tree.validate(index)?;
    }

    let mut builder = GraphBuilder::default();
    for tree in trees {
        builder.ingest_root(tree);
    }
    Ok(builder.finish())
}

/// Like [`normalize`], but a malformed tree is skipped whole instead of
/// failing the pass. Skipped trees are reported in the result.
pub fn normalize_forest(trees: &[AssetNode]) -> NormalizedForest {
    let mut builder = GraphBuilder::default();
    let mut rejected = Vec::new();

    for (index, tree) in trees.iter().enumerate() {
        match tree.validate(index) {
            Ok(()) => builder.ingest_root(tree),
            Err(err) => {
                warn!(tree = index, error = %err, "rejecting malformed acquisition tree");
                rejected.push(RejectedTree {
                    index,
                    root: tree.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    NormalizedForest {
        graph: builder.finish(),
        rejected,
    }
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    roots: Vec<NodeId>,
    index: HashMap<DedupKey, NodeId>,
    edge_set: HashSet<(NodeId, NodeId)>,
    outgoing: Vec<Vec<NodeId>>,
    expanded: HashSet<NodeId>,
}

impl GraphBuilder {
    fn ingest_root(&mut self, tree: &AssetNode) {
        let id = self.visit(tree, None);
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.is_roster_player = true;
        }
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    fn visit(&mut self, asset: &AssetNode, parent: Option<NodeId>) -> NodeId {
        let key = DedupKey::of(asset);
        let id = match self.index.get(&key) {
            Some(id) => *id,
            None => {
                let id = NodeId::from_index(self.nodes.len());
                self.nodes.push(GraphNode::from_asset(id, key.clone(), asset));
                self.outgoing.push(Vec::new());
                self.index.insert(key, id);
                id
            }
        };

        if let Some(parent) = parent {
            self.link(id, parent);
        }

        // Children are walked once, from the first occurrence that lists any.
        // An earlier leaf-only mention does not count as an expansion.
        if !asset.is_leaf() && self.expanded.insert(id) {
            for child in &asset.assets_given_up {
                self.visit(child, Some(id));
            }
        }
        id
    }

    fn link(&mut self, source: NodeId, target: NodeId) {
        if self.edge_set.contains(&(source, target)) {
            return;
        }
        if source == target || self.reaches(target, source) {
            warn!(
                source = %self.nodes[source.index()].dedup_key,
                target = %self.nodes[target.index()].dedup_key,
                "skipping edge that would close a cycle"
            );
            return;
        }
        self.edge_set.insert((source, target));
        self.outgoing[source.index()].push(target);
        self.edges.push(GraphEdge::new(source, target));
    }

    /// Whether `to` is downstream of `from` along existing edges.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            queue.extend(self.outgoing[current.index()].iter().copied());
        }
        false
    }

    fn finish(self) -> AcquisitionGraph {
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            roots = self.roots.len(),
            "normalized acquisition forest"
        );
        AcquisitionGraph {
            nodes: self.nodes,
            edges: self.edges,
            roots: self.roots,
        }
    }
}
