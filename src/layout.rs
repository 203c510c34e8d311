use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::graph::{AcquisitionGraph, NodeId};
use crate::roster::DEFAULT_ROSTER_ORDER;
use crate::trace::PathTracer;

/// Nodes at this depth are always leaves.
pub const MAX_DEPTH: usize = 6;
/// Children kept per node once truncation kicks in.
pub const MAX_CHILDREN_DEEP: usize = 5;
/// First depth whose nodes have their children truncated.
pub const TRUNCATE_FROM_DEPTH: usize = 3;
/// Graphs with fewer edges than this are drawn as two columns.
pub const COLUMN_LAYOUT_MIN_EDGES: usize = 5;

const COLUMN_GAP: f32 = 80.0;
const MAX_VERTICAL_STRETCH: f32 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Roots on the left, surrendered assets to the right.
    #[default]
    Horizontal,
    /// Roots on top, surrendered assets below.
    Vertical,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Horizontal => "horizontal",
            Direction::Vertical => "vertical",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "lr" => Ok(Direction::Horizontal),
            "vertical" | "td" | "tb" => Ok(Direction::Vertical),
            other => Err(format!(
                "unknown layout direction '{other}' (expected horizontal or vertical)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Node sizes by depth; depths past the end reuse the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeTable {
    widths: Vec<f32>,
    heights: Vec<f32>,
}

impl SizeTable {
    /// Empty input falls back to the horizontal defaults.
    pub fn new(widths: Vec<f32>, heights: Vec<f32>) -> Self {
        if widths.is_empty() || heights.is_empty() {
            return Self::horizontal();
        }
        Self { widths, heights }
    }

    pub fn horizontal() -> Self {
        Self {
            widths: vec![280.0, 210.0, 180.0, 160.0, 140.0],
            heights: vec![110.0, 90.0, 80.0, 72.0, 66.0],
        }
    }

    pub fn vertical() -> Self {
        Self {
            widths: vec![260.0, 200.0, 170.0, 150.0, 130.0],
            heights: vec![100.0, 85.0, 75.0, 68.0, 62.0],
        }
    }

    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Horizontal => Self::horizontal(),
            Direction::Vertical => Self::vertical(),
        }
    }

    pub fn at(&self, depth: usize) -> Size {
        Size {
            width: clamped(&self.widths, depth),
            height: clamped(&self.heights, depth),
        }
    }

    fn key_bits(&self) -> Vec<u32> {
        self.widths
            .iter()
            .chain(self.heights.iter())
            .map(|value| value.to_bits())
            .collect()
    }
}

/// Gaps by parent depth. `main` separates a parent from its children,
/// `cross` separates sibling subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapTable {
    main: Vec<f32>,
    cross: Vec<f32>,
}

impl GapTable {
    pub fn new(main: Vec<f32>, cross: Vec<f32>) -> Self {
        if main.is_empty() || cross.is_empty() {
            return Self::horizontal();
        }
        Self { main, cross }
    }

    pub fn horizontal() -> Self {
        Self {
            main: vec![80.0, 60.0, 40.0, 30.0, 24.0],
            cross: vec![28.0, 20.0, 14.0, 10.0, 8.0],
        }
    }

    /// Vertical gaps; a tall target (`aspect_ratio > 1`) stretches the row
    /// gaps by `min(ratio * 1.2, 3)`.
    pub fn vertical(aspect_ratio: Option<f32>) -> Self {
        let stretch = match aspect_ratio {
            Some(ratio) if ratio > 1.0 => (ratio * 1.2).min(MAX_VERTICAL_STRETCH),
            _ => 1.0,
        };
        Self {
            main: [80.0_f32, 65.0, 50.0, 40.0, 32.0]
                .iter()
                .map(|gap| (gap * stretch).round())
                .collect(),
            cross: vec![24.0, 18.0, 14.0, 10.0, 8.0],
        }
    }

    pub fn main_at(&self, depth: usize) -> f32 {
        clamped(&self.main, depth)
    }

    pub fn cross_at(&self, depth: usize) -> f32 {
        clamped(&self.cross, depth)
    }

    fn key_bits(&self) -> Vec<u32> {
        self.main
            .iter()
            .chain(self.cross.iter())
            .map(|value| value.to_bits())
            .collect()
    }
}

fn clamped(values: &[f32], depth: usize) -> f32 {
    values
        .get(depth.min(values.len().saturating_sub(1)))
        .copied()
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub sizes: SizeTable,
    pub gaps: GapTable,
    /// `None` disables the deadline.
    pub budget: Option<Duration>,
}

impl LayoutConfig {
    pub fn new(direction: Direction) -> Self {
        let gaps = match direction {
            Direction::Horizontal => GapTable::horizontal(),
            Direction::Vertical => GapTable::vertical(None),
        };
        Self {
            direction,
            sizes: SizeTable::for_direction(direction),
            gaps,
            budget: None,
        }
    }

    /// Only vertical layouts react to the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: f32) -> Self {
        if self.direction == Direction::Vertical {
            self.gaps = GapTable::vertical(Some(ratio));
        }
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    fn main_size(&self, size: Size) -> f32 {
        match self.direction {
            Direction::Horizontal => size.width,
            Direction::Vertical => size.height,
        }
    }

    fn cross_size(&self, size: Size) -> f32 {
        match self.direction {
            Direction::Horizontal => size.height,
            Direction::Vertical => size.width,
        }
    }

    /// Top-left corner of a box given its main-axis start and cross-axis center.
    fn corner(&self, main: f32, cross_center: f32, size: Size) -> Point {
        match self.direction {
            Direction::Horizontal => Point {
                x: main,
                y: cross_center - size.height / 2.0,
            },
            Direction::Vertical => Point {
                x: cross_center - size.width / 2.0,
                y: main,
            },
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::new(Direction::Horizontal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStrategy {
    Tree,
    Forest,
    Columns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: NodeId,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

impl LayoutNode {
    fn right(&self) -> f32 {
        self.x + self.width
    }

    fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    fn enclosing<'a>(nodes: impl IntoIterator<Item = &'a LayoutNode>) -> Self {
        let mut nodes = nodes.into_iter();
        let Some(first) = nodes.next() else {
            return Bounds::default();
        };
        nodes.fold(
            Bounds {
                min_x: first.x,
                min_y: first.y,
                max_x: first.right(),
                max_y: first.bottom(),
            },
            |bounds, node| Bounds {
                min_x: bounds.min_x.min(node.x),
                min_y: bounds.min_y.min(node.y),
                max_x: bounds.max_x.max(node.right()),
                max_y: bounds.max_y.max(node.bottom()),
            },
        )
    }
}

/// Cubic Bezier connector from the receiving node (`target`) to the asset it
/// gave up (`source`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCurve {
    pub source: NodeId,
    pub target: NodeId,
    pub start: Point,
    pub control_start: Point,
    pub control_end: Point,
    pub end: Point,
    /// Connectors leaving a root are drawn stronger.
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub strategy: LayoutStrategy,
    pub direction: Direction,
    pub positions: BTreeMap<NodeId, LayoutNode>,
    pub bounds: Bounds,
    pub edges: Vec<EdgeCurve>,
    /// Child links dropped by the depth and branching caps.
    pub truncated: usize,
}

impl Layout {
    fn empty(strategy: LayoutStrategy, direction: Direction) -> Self {
        Layout {
            strategy,
            direction,
            positions: BTreeMap::new(),
            bounds: Bounds::default(),
            edges: Vec::new(),
            truncated: 0,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&LayoutNode> {
        self.positions.get(&id)
    }
}

/// Lays out the chain rooted at `root`.
///
/// Never fails: an unknown root yields an empty layout, and small graphs or
/// an exhausted time budget yield the column layout.
pub fn layout(graph: &AcquisitionGraph, root: NodeId, config: &LayoutConfig) -> Layout {
    if !graph.contains(root) {
        debug!(root = %root, "layout requested for a node outside the graph");
        return Layout::empty(LayoutStrategy::Tree, config.direction);
    }
    if graph.edges.len() < COLUMN_LAYOUT_MIN_EDGES {
        let members: Vec<NodeId> = PathTracer::new(graph).ancestors_of(root).into_iter().collect();
        return column_layout(graph, &members, config);
    }

    let mut planner = Planner::new(graph, config);
    match planner.plan(root) {
        Ok(tree) => {
            let mut result = Layout::empty(LayoutStrategy::Tree, config.direction);
            place(&tree, config, 0.0, &mut result);
            finish(result, planner.truncated)
        }
        Err(Overflow) => {
            warn!(root = %root, "layout exceeded its time budget, falling back to columns");
            let members: Vec<NodeId> =
                PathTracer::new(graph).ancestors_of(root).into_iter().collect();
            column_layout(graph, &members, config)
        }
    }
}

/// Lays out every roster root, in roster order, stacked along the cross axis.
/// A node shared with an earlier root keeps its first placement.
pub fn layout_forest(graph: &AcquisitionGraph, config: &LayoutConfig) -> Layout {
    let every_node: Vec<NodeId> = graph.nodes.iter().map(|node| node.id).collect();
    if graph.edges.len() < COLUMN_LAYOUT_MIN_EDGES {
        return column_layout(graph, &every_node, config);
    }

    let mut planner = Planner::new(graph, config);
    let mut result = Layout::empty(LayoutStrategy::Forest, config.direction);
    let mut offset = 0.0;

    for root in roster_order(graph) {
        if planner.placed.contains(&root) {
            continue;
        }
        let tree = match planner.plan(root) {
            Ok(tree) => tree,
            Err(Overflow) => {
                warn!(
                    roots = graph.roots.len(),
                    "forest layout exceeded its time budget, falling back to columns"
                );
                return column_layout(graph, &every_node, config);
            }
        };
        let extent = place(&tree, config, offset, &mut result);
        offset += extent + config.gaps.cross_at(0);
    }

    finish(result, planner.truncated)
}

fn finish(mut result: Layout, truncated: usize) -> Layout {
    result.truncated = truncated;
    result.bounds = Bounds::enclosing(result.positions.values());
    debug!(
        strategy = ?result.strategy,
        nodes = result.positions.len(),
        truncated,
        "computed layout"
    );
    result
}

/// Roster roots sorted by display order, ties by discovery order.
fn roster_order(graph: &AcquisitionGraph) -> Vec<NodeId> {
    let mut roots: Vec<_> = graph
        .roster_nodes()
        .map(|node| (node.roster_order.unwrap_or(DEFAULT_ROSTER_ORDER), node.id))
        .collect();
    roots.sort();
    roots.into_iter().map(|(_, id)| id).collect()
}

/// Two vertical columns: roster players on the left, everything else beside
/// them. The columns stand upright whatever direction was requested, so the
/// result always reports `Horizontal`.
fn column_layout(graph: &AcquisitionGraph, members: &[NodeId], config: &LayoutConfig) -> Layout {
    let config = &LayoutConfig {
        direction: Direction::Horizontal,
        ..config.clone()
    };
    let mut result = Layout::empty(LayoutStrategy::Columns, config.direction);
    let roster: HashSet<NodeId> = graph.roots.iter().copied().collect();

    let mut first: Vec<_> = members
        .iter()
        .filter(|id| roster.contains(*id))
        .filter_map(|id| graph.node(*id))
        .map(|node| (node.roster_order.unwrap_or(DEFAULT_ROSTER_ORDER), node.id))
        .collect();
    first.sort();
    let second: Vec<NodeId> = members
        .iter()
        .filter(|id| !roster.contains(*id) && graph.contains(**id))
        .copied()
        .collect();

    let roster_size = config.sizes.at(0);
    let columns = [
        (0, 0.0, first.into_iter().map(|(_, id)| id).collect::<Vec<_>>()),
        (1, config.main_size(roster_size) + COLUMN_GAP, second),
    ];

    for (depth, main, ids) in columns {
        let size = config.sizes.at(depth);
        let step = config.cross_size(size) + config.gaps.cross_at(depth);
        for (slot, id) in ids.into_iter().enumerate() {
            let center = slot as f32 * step + config.cross_size(size) / 2.0;
            let corner = config.corner(main, center, size);
            result.positions.insert(
                id,
                LayoutNode {
                    id,
                    depth,
                    x: corner.x,
                    y: corner.y,
                    width: size.width,
                    height: size.height,
                    parent_id: None,
                },
            );
        }
    }

    for edge in &graph.edges {
        if let (Some(parent), Some(child)) =
            (result.get(edge.target), result.get(edge.source))
        {
            let curve = if parent.depth == child.depth {
                side_curve(parent, child)
            } else {
                curve_between(parent, child, config)
            };
            result.edges.push(curve);
        }
    }

    debug!(nodes = result.positions.len(), "computed column layout");
    result.bounds = Bounds::enclosing(result.positions.values());
    result
}

struct Overflow;

#[cfg(not(target_arch = "wasm32"))]
struct Deadline(Option<std::time::Instant>);

#[cfg(not(target_arch = "wasm32"))]
impl Deadline {
    fn start(budget: Option<Duration>) -> Self {
        Deadline(budget.map(|budget| std::time::Instant::now() + budget))
    }

    fn expired(&self) -> bool {
        self.0
            .is_some_and(|deadline| std::time::Instant::now() >= deadline)
    }
}

// No monotonic clock on wasm32; the depth and branching caps bound the work.
#[cfg(target_arch = "wasm32")]
struct Deadline;

#[cfg(target_arch = "wasm32")]
impl Deadline {
    fn start(_budget: Option<Duration>) -> Self {
        Deadline
    }

    fn expired(&self) -> bool {
        false
    }
}

struct Slot {
    id: NodeId,
    depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Extracts capped spanning trees from the graph, following edges from each
/// receiver to the assets it gave up.
struct Planner<'g> {
    sources: Vec<Vec<NodeId>>,
    placed: HashSet<NodeId>,
    deadline: Deadline,
    truncated: usize,
    graph: &'g AcquisitionGraph,
}

impl<'g> Planner<'g> {
    fn new(graph: &'g AcquisitionGraph, config: &LayoutConfig) -> Self {
        Self {
            sources: graph.sources_by_target(),
            placed: HashSet::new(),
            deadline: Deadline::start(config.budget),
            truncated: 0,
            graph,
        }
    }

    /// Slots come out in pre-order, so every parent precedes its children.
    fn plan(&mut self, root: NodeId) -> Result<Vec<Slot>, Overflow> {
        let mut tree = Vec::new();
        if self.graph.contains(root) {
            self.placed.insert(root);
            self.grow(&mut tree, root, 0, None)?;
        }
        Ok(tree)
    }

    fn grow(
        &mut self,
        tree: &mut Vec<Slot>,
        id: NodeId,
        depth: usize,
        parent: Option<usize>,
    ) -> Result<usize, Overflow> {
        if self.deadline.expired() {
            return Err(Overflow);
        }

        let slot = tree.len();
        tree.push(Slot {
            id,
            depth,
            parent,
            children: Vec::new(),
        });

        let candidates: Vec<NodeId> = self
            .sources
            .get(id.index())
            .into_iter()
            .flatten()
            .filter(|child| !self.placed.contains(*child))
            .copied()
            .collect();

        let limit = if depth >= MAX_DEPTH {
            0
        } else if depth >= TRUNCATE_FROM_DEPTH {
            MAX_CHILDREN_DEEP
        } else {
            candidates.len()
        };
        self.truncated += candidates.len().saturating_sub(limit);

        let kept: Vec<NodeId> = candidates.into_iter().take(limit).collect();
        self.placed.extend(kept.iter().copied());
        for child in kept {
            let child_slot = self.grow(tree, child, depth + 1, Some(slot))?;
            tree[slot].children.push(child_slot);
        }
        Ok(slot)
    }
}

/// Sizes and places one planned tree starting `offset` along the cross axis.
/// Returns the tree's cross-axis extent.
fn place(tree: &[Slot], config: &LayoutConfig, offset: f32, result: &mut Layout) -> f32 {
    let Some(root) = tree.first() else {
        return 0.0;
    };

    // Post-order sizing: children always sit after their parent.
    let mut extents = vec![0.0_f32; tree.len()];
    for (index, slot) in tree.iter().enumerate().rev() {
        let own = config.cross_size(config.sizes.at(slot.depth));
        extents[index] = if slot.children.is_empty() {
            own
        } else {
            own.max(children_span(slot, &extents, config))
        };
    }

    // Pre-order placement: main-axis start and cross-axis center per slot.
    let mut mains = vec![0.0_f32; tree.len()];
    let mut centers = vec![0.0_f32; tree.len()];
    centers[0] = offset + extents[0] / 2.0;

    for (index, slot) in tree.iter().enumerate() {
        let size = config.sizes.at(slot.depth);
        let corner = config.corner(mains[index], centers[index], size);
        result.positions.insert(
            slot.id,
            LayoutNode {
                id: slot.id,
                depth: slot.depth,
                x: corner.x,
                y: corner.y,
                width: size.width,
                height: size.height,
                parent_id: slot.parent.map(|parent| tree[parent].id),
            },
        );

        if slot.children.is_empty() {
            continue;
        }
        let child_main = mains[index] + config.main_size(size) + config.gaps.main_at(slot.depth);
        let gap = config.gaps.cross_at(slot.depth);
        let mut cursor = centers[index] - children_span(slot, &extents, config) / 2.0;
        for child in &slot.children {
            mains[*child] = child_main;
            centers[*child] = cursor + extents[*child] / 2.0;
            cursor += extents[*child] + gap;
        }
    }

    for slot in tree {
        let parent = slot
            .parent
            .and_then(|parent| result.positions.get(&tree[parent].id));
        let child = result.positions.get(&slot.id);
        if let (Some(parent), Some(child)) = (parent, child) {
            let curve = curve_between(parent, child, config);
            result.edges.push(curve);
        }
    }

    debug!(root = %root.id, nodes = tree.len(), extent = extents[0], "placed tree");
    extents[0]
}

fn children_span(slot: &Slot, extents: &[f32], config: &LayoutConfig) -> f32 {
    let total: f32 = slot.children.iter().map(|child| extents[*child]).sum();
    total + config.gaps.cross_at(slot.depth) * slot.children.len().saturating_sub(1) as f32
}

/// Parent's trailing edge to the child's leading edge; control points sit
/// half a main gap out from each end.
fn curve_between(parent: &LayoutNode, child: &LayoutNode, config: &LayoutConfig) -> EdgeCurve {
    let pull = config.gaps.main_at(parent.depth) / 2.0;
    let (start, end, control_start, control_end) = match config.direction {
        Direction::Horizontal => {
            let start = Point {
                x: parent.right(),
                y: parent.y + parent.height / 2.0,
            };
            let end = Point {
                x: child.x,
                y: child.y + child.height / 2.0,
            };
            (
                start,
                end,
                Point {
                    x: start.x + pull,
                    y: start.y,
                },
                Point {
                    x: end.x - pull,
                    y: end.y,
                },
            )
        }
        Direction::Vertical => {
            let start = Point {
                x: parent.x + parent.width / 2.0,
                y: parent.bottom(),
            };
            let end = Point {
                x: child.x + child.width / 2.0,
                y: child.y,
            };
            (
                start,
                end,
                Point {
                    x: start.x,
                    y: start.y + pull,
                },
                Point {
                    x: end.x,
                    y: end.y - pull,
                },
            )
        }
    };

    EdgeCurve {
        source: child.id,
        target: parent.id,
        start,
        control_start,
        control_end,
        end,
        emphasized: parent.depth == 0,
    }
}

/// Connector between two boxes of the same column: leaves and re-enters on
/// the right-hand side, bowing out by half the column gap.
fn side_curve(parent: &LayoutNode, child: &LayoutNode) -> EdgeCurve {
    let start = Point {
        x: parent.right(),
        y: parent.y + parent.height / 2.0,
    };
    let end = Point {
        x: child.right(),
        y: child.y + child.height / 2.0,
    };
    let bow = start.x.max(end.x) + COLUMN_GAP / 2.0;

    EdgeCurve {
        source: child.id,
        target: parent.id,
        start,
        control_start: Point { x: bow, y: start.y },
        control_end: Point { x: bow, y: end.y },
        end,
        emphasized: parent.depth == 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    root: Option<NodeId>,
    direction: Direction,
    sizes: Vec<u32>,
    gaps: Vec<u32>,
}

/// Memoizes layouts until the graph they were computed for changes.
#[derive(Debug, Default)]
pub struct LayoutCache {
    fingerprint: Option<u64>,
    entries: HashMap<CacheKey, Layout>,
    hits: usize,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `root = None` requests the forest layout.
    pub fn get_or_compute(
        &mut self,
        graph: &AcquisitionGraph,
        root: Option<NodeId>,
        config: &LayoutConfig,
    ) -> &Layout {
        let fingerprint = graph.fingerprint();
        if self.fingerprint != Some(fingerprint) {
            if self.fingerprint.is_some() {
                debug!(entries = self.entries.len(), "graph changed, clearing layout cache");
            }
            self.entries.clear();
            self.fingerprint = Some(fingerprint);
        }

        let key = CacheKey {
            root,
            direction: config.direction,
            sizes: config.sizes.key_bits(),
            gaps: config.gaps.key_bits(),
        };
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(match root {
                Some(root) => layout(graph, root, config),
                None => layout_forest(graph, config),
            }),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AcquisitionType as Acq, AssetNode};
    use crate::attributes::{OriginPolicy, derive_attributes};
    use crate::graph::normalize;
    use crate::roster::{RosterCategory, RosterOrderTable};

    fn pick(name: &str, year: u32) -> AssetNode {
        AssetNode::pick(name).acquired(Acq::Original, format!("{year}-06-20"))
    }

    /// Root with three trades, each paid for with two picks.
    fn bushy() -> AssetNode {
        let trade = |name: &str, year: u32| {
            AssetNode::player(name)
                .acquired(Acq::Trade, format!("{year}-02-01"))
                .giving_up([
                    pick(&format!("{name} pick A"), year - 2),
                    pick(&format!("{name} pick B"), year - 3),
                ])
        };
        AssetNode::player("Root")
            .acquired(Acq::Trade, "2024-07-01")
            .giving_up([trade("One", 2020), trade("Two", 2021), trade("Three", 2022)])
    }

    fn chain(length: usize) -> AssetNode {
        let mut node = pick("Link 0", 2000);
        for step in 1..length {
            node = AssetNode::player(format!("Link {step}"))
                .acquired(Acq::Trade, format!("{}-01-01", 2000 + step))
                .giving_up([node]);
        }
        node
    }

    fn graph_of(trees: &[AssetNode]) -> AcquisitionGraph {
        normalize(trees).unwrap()
    }

    fn overlaps(a: &LayoutNode, b: &LayoutNode) -> bool {
        a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
    }

    fn assert_no_overlap(layout: &Layout) {
        let nodes: Vec<_> = layout.positions.values().collect();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                assert!(!overlaps(a, b), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn tree_layout_places_every_node_without_overlap() {
        let graph = graph_of(&[bushy()]);
        for direction in [Direction::Horizontal, Direction::Vertical] {
            let layout = layout(&graph, graph.roots[0], &LayoutConfig::new(direction));
            assert_eq!(layout.strategy, LayoutStrategy::Tree);
            assert_eq!(layout.positions.len(), graph.nodes.len());
            assert_eq!(layout.edges.len(), graph.edges.len());
            assert_eq!(layout.truncated, 0);
            assert_no_overlap(&layout);
        }
    }

    #[test]
    fn root_is_centered_on_its_extent() {
        let graph = graph_of(&[bushy()]);
        let config = LayoutConfig::new(Direction::Horizontal);
        let layout = layout(&graph, graph.roots[0], &config);
        let root = layout.get(graph.roots[0]).unwrap();

        assert_eq!(root.x, 0.0);
        assert_eq!(root.width, 280.0);
        let center = root.y + root.height / 2.0;
        assert!((center - layout.bounds.height() / 2.0).abs() < 0.01);
        assert_eq!(layout.bounds.min_y, 0.0);
    }

    #[test]
    fn children_advance_by_parent_size_plus_gap() {
        let graph = graph_of(&[bushy()]);
        let layout = layout(&graph, graph.roots[0], &LayoutConfig::new(Direction::Vertical));
        let one = graph.find_by_name("One").unwrap().id;
        let placed = layout.get(one).unwrap();

        assert_eq!(placed.depth, 1);
        assert_eq!(placed.y, 100.0 + 80.0);
        assert_eq!(placed.width, 200.0);
        assert_eq!(placed.parent_id, Some(graph.roots[0]));
    }

    #[test]
    fn depth_cap_turns_sixth_level_into_leaves() {
        let graph = graph_of(&[chain(9)]);
        let layout = layout(&graph, graph.roots[0], &LayoutConfig::default());

        assert_eq!(layout.positions.len(), MAX_DEPTH + 1);
        assert_eq!(layout.truncated, 1);
        assert!(layout.positions.values().all(|node| node.depth <= MAX_DEPTH));
    }

    #[test]
    fn deep_nodes_keep_only_five_children() {
        let wide = AssetNode::player("Wide")
            .acquired(Acq::Trade, "2010-01-01")
            .giving_up((0..7).map(|n| pick(&format!("Pick {n}"), 2000 + n)));
        let tree = AssetNode::player("Top")
            .acquired(Acq::Trade, "2020-01-01")
            .giving_up([AssetNode::player("Mid")
                .acquired(Acq::Trade, "2015-01-01")
                .giving_up([AssetNode::player("Low")
                    .acquired(Acq::Trade, "2012-01-01")
                    .giving_up([wide])])]);

        let graph = graph_of(&[tree]);
        let layout = layout(&graph, graph.roots[0], &LayoutConfig::default());

        assert_eq!(layout.positions.len(), 4 + MAX_CHILDREN_DEEP);
        assert_eq!(layout.truncated, 2);
        assert!(layout.positions.values().all(|node| node.depth <= 4));
    }

    #[test]
    fn small_graphs_use_the_column_layout() {
        let tatum = AssetNode::player("Jayson Tatum")
            .acquired(Acq::Draft, "2017-06-22")
            .giving_up([AssetNode::pick("BKN 2017 1st")
                .acquired(Acq::Trade, "2013-07-12")
                .via("BKN")]);
        let graph = graph_of(&[tatum]);
        let layout = layout_forest(&graph, &LayoutConfig::default());

        assert_eq!(layout.strategy, LayoutStrategy::Columns);
        let root = layout.get(graph.roots[0]).unwrap();
        let pick = layout.get(graph.find_by_name("BKN 2017 1st").unwrap().id).unwrap();
        assert_eq!(root.x, 0.0);
        assert_eq!(pick.x, 280.0 + 80.0);
        assert_eq!(layout.edges.len(), 1);
    }

    #[test]
    fn vertical_requests_still_get_upright_columns() {
        let tatum = AssetNode::player("Jayson Tatum")
            .acquired(Acq::Draft, "2017-06-22")
            .giving_up([AssetNode::pick("BKN 2017 1st")
                .acquired(Acq::Trade, "2013-07-12")
                .via("BKN")]);
        let extra = AssetNode::player("Jaylen Brown").acquired(Acq::Draft, "2016-06-23");
        let graph = graph_of(&[tatum, extra]);
        let layout = layout_forest(&graph, &LayoutConfig::new(Direction::Vertical));

        assert_eq!(layout.strategy, LayoutStrategy::Columns);
        assert_eq!(layout.direction, Direction::Horizontal);
        let tatum = layout.get(graph.roots[0]).unwrap();
        let brown = layout.get(graph.roots[1]).unwrap();
        let pick = layout.get(graph.find_by_name("BKN 2017 1st").unwrap().id).unwrap();

        assert_eq!(tatum.x, brown.x);
        assert!(tatum.y < brown.y);
        assert_eq!(pick.x, 260.0 + 80.0);
        assert_eq!(pick.y, 0.0);
    }

    #[test]
    fn same_column_edges_bow_out_to_the_side() {
        let trees = [
            AssetNode::player("Star")
                .acquired(Acq::Trade, "2024-02-01")
                .giving_up([AssetNode::player("Jaylen Brown").acquired(Acq::Draft, "2016-06-23")]),
            AssetNode::player("Jaylen Brown").acquired(Acq::Draft, "2016-06-23"),
            AssetNode::player("Other")
                .acquired(Acq::Trade, "2023-01-01")
                .giving_up([AssetNode::player("Mid")
                    .acquired(Acq::Trade, "2019-01-01")
                    .giving_up([pick("Old pick", 2015)])]),
        ];
        let graph = graph_of(&trees);
        let layout = layout_forest(&graph, &LayoutConfig::default());
        assert_eq!(layout.strategy, LayoutStrategy::Columns);
        assert_eq!(layout.edges.len(), 3);

        for curve in &layout.edges {
            let parent = layout.get(curve.target).unwrap();
            let child = layout.get(curve.source).unwrap();
            if parent.depth == child.depth {
                assert_eq!(curve.start.x, parent.right());
                assert_eq!(curve.end.x, child.right());
                assert!(curve.control_start.x > curve.start.x);
                assert!(curve.control_end.x > curve.end.x);
            } else {
                assert_eq!(curve.start.x, parent.right());
                assert_eq!(curve.end.x, child.x);
                assert!(curve.end.x > curve.start.x);
            }
        }
        let same_column = layout
            .edges
            .iter()
            .filter(|curve| curve.start.x == curve.end.x)
            .count();
        assert_eq!(same_column, 2);
    }

    #[test]
    fn column_layout_orders_roster_by_display_order() {
        let roster = RosterOrderTable::new()
            .with("BOS", "Second", 2, RosterCategory::Starter)
            .with("BOS", "First", 1, RosterCategory::Starter);
        let trees = [
            AssetNode::player("Second").acquired(Acq::Draft, "2019-06-20"),
            AssetNode::player("First").acquired(Acq::Draft, "2018-06-21"),
        ];
        let graph = derive_attributes(graph_of(&trees), &roster, "BOS", OriginPolicy::Global);
        let layout = layout_forest(&graph, &LayoutConfig::default());

        let first = layout.get(graph.find_by_name("First").unwrap().id).unwrap();
        let second = layout.get(graph.find_by_name("Second").unwrap().id).unwrap();
        assert!(first.y < second.y);
    }

    #[test]
    fn forest_stacks_roots_and_places_shared_nodes_once() {
        let shared = || {
            AssetNode::player("Shared")
                .acquired(Acq::Trade, "2018-01-01")
                .giving_up([pick("Shared pick", 2016)])
        };
        let trees = [
            bushy(),
            AssetNode::player("Other")
                .acquired(Acq::Trade, "2023-01-01")
                .giving_up([shared(), pick("Other pick", 2019)]),
            AssetNode::player("Third")
                .acquired(Acq::Trade, "2023-06-01")
                .giving_up([shared()]),
        ];
        let graph = graph_of(&trees);
        let layout = layout_forest(&graph, &LayoutConfig::default());

        assert_eq!(layout.strategy, LayoutStrategy::Forest);
        assert_eq!(layout.positions.len(), graph.nodes.len());
        assert_no_overlap(&layout);

        let shared = layout.get(graph.find_by_name("Shared").unwrap().id).unwrap();
        assert_eq!(shared.parent_id, Some(graph.find_by_name("Other").unwrap().id));
    }

    #[test]
    fn layout_is_deterministic() {
        let graph = graph_of(&[bushy(), chain(4)]);
        let config = LayoutConfig::new(Direction::Vertical).with_aspect_ratio(1.5);
        assert_eq!(layout_forest(&graph, &config), layout_forest(&graph, &config));
    }

    #[test]
    fn horizontal_curves_run_from_trailing_to_leading_edge() {
        let graph = graph_of(&[bushy()]);
        let layout = layout(&graph, graph.roots[0], &LayoutConfig::default());
        let root = layout.get(graph.roots[0]).unwrap();

        for curve in layout.edges.iter().filter(|curve| curve.target == graph.roots[0]) {
            assert!(curve.emphasized);
            assert_eq!(curve.start.x, root.right());
            assert_eq!(curve.control_start.x, root.right() + 40.0);
            let child = layout.get(curve.source).unwrap();
            assert_eq!(curve.end.x, child.x);
            assert_eq!(curve.end.y, child.y + child.height / 2.0);
        }
        assert!(layout.edges.iter().any(|curve| !curve.emphasized));
    }

    #[test]
    fn tables_clamp_to_their_last_entry() {
        let sizes = SizeTable::horizontal();
        assert_eq!(sizes.at(4), sizes.at(9));
        assert_eq!(GapTable::horizontal().cross_at(12), 8.0);
    }

    #[test]
    fn tall_aspect_ratios_stretch_vertical_gaps() {
        assert_eq!(GapTable::vertical(Some(2.0)).main_at(0), 192.0);
        assert_eq!(GapTable::vertical(Some(5.0)).main_at(0), 240.0);
        assert_eq!(GapTable::vertical(Some(0.5)).main_at(0), 80.0);
        assert_eq!(GapTable::vertical(None).cross_at(0), 24.0);
    }

    #[test]
    fn unknown_root_gives_an_empty_layout() {
        let graph = graph_of(&[bushy()]);
        let layout = layout(&graph, "node-500".parse().unwrap(), &LayoutConfig::default());
        assert!(layout.positions.is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn exhausted_budget_falls_back_to_columns() {
        let graph = graph_of(&[bushy()]);
        let config = LayoutConfig::default().with_budget(Duration::ZERO);
        let layout = layout_forest(&graph, &config);
        assert_eq!(layout.strategy, LayoutStrategy::Columns);
        assert_eq!(layout.positions.len(), graph.nodes.len());
    }

    #[test]
    fn cache_reuses_layouts_until_the_graph_changes() {
        let mut cache = LayoutCache::new();
        let graph = graph_of(&[bushy()]);
        let config = LayoutConfig::default();

        let first = cache.get_or_compute(&graph, None, &config).clone();
        let again = cache.get_or_compute(&graph, None, &config).clone();
        assert_eq!(first, again);
        assert_eq!(cache.hits(), 1);

        cache.get_or_compute(&graph, Some(graph.roots[0]), &config);
        assert_eq!(cache.len(), 2);

        let bigger = graph_of(&[bushy(), chain(3)]);
        cache.get_or_compute(&bigger, None, &config);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }
}
