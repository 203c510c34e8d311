//! Acquisition graph engine.
//!
//! Turns per-player transaction trees into one deduplicated graph, derives
//! origin and roster attributes, traces ancestor chains and lays the result
//! out for rendering. Everything outside [`store`] is pure.

pub mod asset;
pub mod attributes;
pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
#[cfg(feature = "cli")]
pub mod logging;
pub mod roster;
pub mod store;
pub mod team;
pub mod trace;
pub mod utils;

pub use asset::{AcquisitionType, AssetNode, RawAssetType, TreeFile, TreeMeta};
pub use attributes::{ChainStats, GraphStats, OriginPolicy, derive_attributes};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use graph::{
    AcquisitionGraph, AssetKind, DedupKey, GraphEdge, GraphNode, NodeId, NormalizedForest,
    RejectedTree, normalize, normalize_forest,
};
pub use layout::{
    Direction, EdgeCurve, GapTable, Layout, LayoutCache, LayoutConfig, LayoutNode, LayoutStrategy,
    SizeTable, layout, layout_forest,
};
pub use roster::{RosterCategory, RosterOrderEntry, RosterOrderTable};
pub use store::{DirectoryTreeSource, MemoryTreeSource, TreeSource};
pub use team::{PlayerChain, TeamGraph};
pub use trace::{Highlight, PathTracer};
