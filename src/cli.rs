use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Args, Parser, ValueEnum};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rosterdna::logging::init_logging;
use rosterdna::{
    DirectoryTreeSource, EngineConfig, GraphNode, Highlight, Layout, NodeId, OriginPolicy,
    PathTracer, PlayerChain, RosterOrderTable, TeamGraph, TreeSource, layout, layout_forest,
};

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OriginPolicyArg {
    Global,
    PerComponent,
}

impl From<OriginPolicyArg> for OriginPolicy {
    fn from(arg: OriginPolicyArg) -> Self {
        match arg {
            OriginPolicyArg::Global => OriginPolicy::Global,
            OriginPolicyArg::PerComponent => OriginPolicy::PerComponent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum DirectionArg {
    Horizontal,
    Vertical,
}

impl From<DirectionArg> for rosterdna::Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Horizontal => rosterdna::Direction::Horizontal,
            DirectionArg::Vertical => rosterdna::Direction::Vertical,
        }
    }
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Team abbreviation, e.g. BOS.
    #[arg(short = 't', long = "team")]
    team: String,

    /// Directory holding `<team>-<player>.json` tree files (defaults to ROSTERDNA_DATA_DIR).
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// JSON file mapping team -> player -> {order, category}.
    #[arg(long = "roster-order")]
    roster_order: Option<PathBuf>,

    /// How origins are chosen when the roster graph has several components.
    #[arg(long = "origin-policy", value_enum, default_value = "global")]
    origin_policy: OriginPolicyArg,

    /// Path to the output file. Use '-' or omit to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Log progress to stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "rosterdna graph",
    about = "Build a team's deduplicated acquisition graph and print it as JSON."
)]
struct GraphArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Emit a single player's chain instead of the whole roster.
    #[arg(short = 'p', long = "player")]
    player: Option<String>,
}

#[derive(Debug, Parser)]
#[command(
    name = "rosterdna trace",
    about = "Print the ancestor chain of a node with render highlight flags."
)]
struct TraceArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Node id to trace, e.g. node-3.
    #[arg(long = "node", required_unless_present = "player", conflicts_with = "player")]
    node: Option<String>,

    /// Roster player to trace, by name.
    #[arg(short = 'p', long = "player")]
    player: Option<String>,
}

#[derive(Debug, Parser)]
#[command(
    name = "rosterdna team-links",
    about = "List trade partners, or the roster chains involving one partner."
)]
struct TeamLinksArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Partner team abbreviation; omit to list every partner.
    #[arg(long = "partner")]
    partner: Option<String>,
}

#[derive(Debug, Parser)]
#[command(
    name = "rosterdna layout",
    about = "Compute node positions and connector curves for rendering."
)]
struct LayoutArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Lay out one player's chain instead of the whole roster.
    #[arg(short = 'p', long = "player")]
    player: Option<String>,

    /// Main axis of the tree.
    #[arg(long = "direction", value_enum, default_value = "horizontal")]
    direction: DirectionArg,

    /// Target height / width; values above 1 stretch vertical row gaps.
    #[arg(long = "aspect-ratio")]
    aspect_ratio: Option<f32>,
}

/// Everything a command needs once its common flags are resolved.
struct Workspace {
    config: EngineConfig,
    source: DirectoryTreeSource,
    roster: RosterOrderTable,
    team: String,
    policy: OriginPolicy,
    output: OutputDestination,
    quiet: bool,
}

impl Workspace {
    fn open(common: &CommonArgs) -> Result<Self> {
        let mut config = EngineConfig::default();
        init_logging(&config.log_filter, common.verbose)?;
        if let Some(dir) = &common.data_dir {
            config = config.with_data_dir(dir);
        }

        let roster = match &common.roster_order {
            Some(path) => load_roster(path)?,
            None => RosterOrderTable::new(),
        };

        Ok(Self {
            source: DirectoryTreeSource::new(&config.data_dir),
            config,
            roster,
            team: common.team.trim().to_uppercase(),
            policy: common.origin_policy.into(),
            output: parse_output(common.output.as_deref())?,
            quiet: common.quiet,
        })
    }

    fn team_graph(&self) -> Result<TeamGraph> {
        let files = self.source.load_team(&self.team).with_context(|| {
            format!(
                "failed to load trees for {} from '{}'",
                self.team,
                self.source.root().display()
            )
        })?;
        Ok(TeamGraph::build(&self.team, &files, &self.roster, self.policy))
    }

    fn player_chain(&self, player: &str) -> Result<PlayerChain> {
        let file = self
            .source
            .load_player(&self.team, player)
            .with_context(|| format!("failed to load the tree for '{player}'"))?;
        PlayerChain::build(&file, &self.roster, self.policy)
            .with_context(|| format!("the tree for '{player}' is malformed"))
    }

    fn emit(&self, what: &str, value: &impl Serialize) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        write_output(self.output.clone(), &bytes, what, self.quiet)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeSummary<'a> {
    id: NodeId,
    name: &'a str,
    is_roster_player: bool,
    is_origin: bool,
}

impl<'a> From<&'a GraphNode> for NodeSummary<'a> {
    fn from(node: &'a GraphNode) -> Self {
        NodeSummary {
            id: node.id,
            name: &node.name,
            is_roster_player: node.is_roster_player,
            is_origin: node.is_origin,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceReport<'a> {
    team: &'a str,
    query: String,
    nodes: Vec<NodeSummary<'a>>,
    highlight: Highlight,
}

impl<'a> TraceReport<'a> {
    fn new(team: &'a TeamGraph, query: String, selection: BTreeSet<NodeId>) -> Self {
        let nodes = selection
            .iter()
            .filter_map(|id| team.graph.node(*id))
            .map(NodeSummary::from)
            .collect();
        TraceReport {
            team: &team.team,
            query,
            nodes,
            highlight: Highlight::from_selection(&team.graph, selection),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutReport<'a> {
    team: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    player: Option<&'a str>,
    nodes: &'a [GraphNode],
    #[serde(flatten)]
    layout: &'a Layout,
}

fn run_graph(args: GraphArgs) -> Result<()> {
    let workspace = Workspace::open(&args.common)?;
    match args.player.as_deref() {
        Some(player) => {
            let chain = workspace.player_chain(player)?;
            workspace.emit("player chain", &chain)
        }
        None => {
            let team = workspace.team_graph()?;
            if !team.rejected.is_empty() && !workspace.quiet {
                eprintln!(
                    "skipped {} malformed tree(s) for {}",
                    team.rejected.len(),
                    team.team
                );
            }
            workspace.emit("team graph", &team)
        }
    }
}

fn run_trace(args: TraceArgs) -> Result<()> {
    let workspace = Workspace::open(&args.common)?;
    let team = workspace.team_graph()?;
    let tracer = PathTracer::new(&team.graph);

    let (query, start) = match (args.node.as_deref(), args.player.as_deref()) {
        (Some(node), _) => (
            node.to_string(),
            tracer
                .resolve(node)
                .with_context(|| format!("cannot trace from '{node}'"))?,
        ),
        (None, Some(player)) => {
            let node = team
                .graph
                .roster_nodes()
                .find(|node| node.name.eq_ignore_ascii_case(player))
                .ok_or_else(|| anyhow!("no roster player named '{player}' in {}", team.team))?;
            (player.to_string(), node.id)
        }
        (None, None) => bail!("either --node or --player is required"),
    };

    let report = TraceReport::new(&team, query, tracer.ancestors_of(start));
    workspace.emit("trace", &report)
}

fn run_team_links(args: TeamLinksArgs) -> Result<()> {
    let workspace = Workspace::open(&args.common)?;
    let team = workspace.team_graph()?;

    match args.partner.as_deref() {
        Some(partner) => {
            let partner = partner.trim().to_uppercase();
            let related = PathTracer::new(&team.graph).team_related_chains(&partner);
            if related.is_empty() && !workspace.quiet {
                eprintln!("no {} chain involves a trade with {partner}", team.team);
            }
            let report = TraceReport::new(&team, partner, related);
            workspace.emit("team links", &report)
        }
        None => workspace.emit("trade partners", &team.trade_partners),
    }
}

fn run_layout(args: LayoutArgs) -> Result<()> {
    let workspace = Workspace::open(&args.common)?;
    let mut config = workspace.config.layout_config(args.direction.into());
    if let Some(ratio) = args.aspect_ratio {
        if !ratio.is_finite() || ratio <= 0.0 {
            bail!("--aspect-ratio must be a positive number, got {ratio}");
        }
        config = config.with_aspect_ratio(ratio);
    }

    match args.player.as_deref() {
        Some(player) => {
            let chain = workspace.player_chain(player)?;
            let root = chain
                .root()
                .ok_or_else(|| anyhow!("the tree for '{player}' has no root"))?;
            let computed = layout(&chain.graph, root, &config);
            workspace.emit(
                "layout",
                &LayoutReport {
                    team: &chain.team,
                    player: Some(&chain.player),
                    nodes: &chain.graph.nodes,
                    layout: &computed,
                },
            )
        }
        None => {
            let team = workspace.team_graph()?;
            let computed = layout_forest(&team.graph, &config);
            workspace.emit(
                "layout",
                &LayoutReport {
                    team: &team.team,
                    player: None,
                    nodes: &team.graph.nodes,
                    layout: &computed,
                },
            )
        }
    }
}

pub fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("graph") => run_graph(GraphArgs::parse_from(subcommand_args(&args))),
        Some("trace") => run_trace(TraceArgs::parse_from(subcommand_args(&args))),
        Some("team-links") => run_team_links(TeamLinksArgs::parse_from(subcommand_args(&args))),
        Some("layout") => run_layout(LayoutArgs::parse_from(subcommand_args(&args))),
        _ => run_graph(GraphArgs::parse_from(args)),
    }
}

/// Drops the subcommand name so the per-command parser sees `bin --flags`.
fn subcommand_args(args: &[String]) -> Vec<String> {
    let bin = args.first().cloned().unwrap_or_else(|| "rosterdna".to_string());
    std::iter::once(bin).chain(args.iter().skip(2).cloned()).collect()
}

fn load_roster(path: &Path) -> Result<RosterOrderTable> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("'{}' is not a valid roster order table", path.display()))
}

fn parse_output(output: Option<&str>) -> Result<OutputDestination> {
    match output {
        None | Some("-") => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
    }
}

fn write_output(dest: OutputDestination, bytes: &[u8], what: &str, quiet: bool) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("Wrote {what} -> {}", path.display());
            }
        }
    }
    Ok(())
}
