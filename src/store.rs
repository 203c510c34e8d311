//! Read-only access to stored transaction trees.
//!
//! The engine never calls into this module; it exists so the command line
//! tool and integration tests can feed real tree files through the engine.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::asset::TreeFile;
use crate::error::{EngineError, Result};
use crate::utils::{last_name_slug, slugify};

pub trait TreeSource {
    /// Every tree stored for `team`, in a stable order.
    fn load_team(&self, team: &str) -> Result<Vec<TreeFile>>;

    /// The tree for one player, looked up by name, slug or id.
    fn load_player(&self, team: &str, player: &str) -> Result<TreeFile>;
}

/// Tree files laid out as `<dir>/<team>-<player-slug>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryTreeSource {
    root: PathBuf,
}

impl DirectoryTreeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File names tried for a player, most specific first.
    fn candidates(&self, team: &str, player: &str) -> Vec<PathBuf> {
        let team = team.to_lowercase();
        let slug = slugify(player);
        let mut names = vec![
            format!("{team}-{slug}.json"),
            format!("{team}-{}.json", last_name_slug(&slug)),
            format!("{team}-{player}.json"),
        ];
        names.dedup();
        names.into_iter().map(|name| self.root.join(name)).collect()
    }
}

fn read_tree_file(path: &Path) -> Result<TreeFile> {
    let contents = fs::read_to_string(path).map_err(|source| EngineError::Store {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| EngineError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

impl TreeSource for DirectoryTreeSource {
    fn load_team(&self, team: &str) -> Result<Vec<TreeFile>> {
        let prefix = format!("{}-", team.to_lowercase());
        let not_found = || EngineError::TreeNotFound {
            team: team.to_string(),
            player: None,
        };
        if !self.root.is_dir() {
            warn!(dir = %self.root.display(), "tree directory does not exist");
            return Err(not_found());
        }

        let mut trees = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            let file_name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file()
                || !file_name.starts_with(&prefix)
                || !file_name.ends_with(".json")
            {
                continue;
            }

            match read_tree_file(entry.path()) {
                Ok(tree) => trees.push(tree),
                Err(err) => warn!(error = %err, "skipping tree file"),
            }
        }

        debug!(team, trees = trees.len(), "loaded team trees");
        if trees.is_empty() {
            return Err(not_found());
        }
        Ok(trees)
    }

    fn load_player(&self, team: &str, player: &str) -> Result<TreeFile> {
        for path in self.candidates(team, player) {
            if path.is_file() {
                debug!(path = %path.display(), "loading player tree");
                return read_tree_file(&path);
            }
        }
        Err(EngineError::TreeNotFound {
            team: team.to_string(),
            player: Some(player.to_string()),
        })
    }
}

/// Trees held in memory, matched on their `_meta` block.
#[derive(Debug, Clone, Default)]
pub struct MemoryTreeSource {
    files: Vec<TreeFile>,
}

impl MemoryTreeSource {
    pub fn new(files: impl IntoIterator<Item = TreeFile>) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }
}

impl TreeSource for MemoryTreeSource {
    fn load_team(&self, team: &str) -> Result<Vec<TreeFile>> {
        let trees: Vec<TreeFile> = self
            .files
            .iter()
            .filter(|file| file.meta.team.eq_ignore_ascii_case(team))
            .cloned()
            .collect();
        if trees.is_empty() {
            return Err(EngineError::TreeNotFound {
                team: team.to_string(),
                player: None,
            });
        }
        Ok(trees)
    }

    fn load_player(&self, team: &str, player: &str) -> Result<TreeFile> {
        let wanted = slugify(player);
        self.files
            .iter()
            .filter(|file| file.meta.team.eq_ignore_ascii_case(team))
            .find(|file| {
                let slug = slugify(&file.meta.player);
                slug == wanted || last_name_slug(&slug) == wanted
            })
            .cloned()
            .ok_or_else(|| EngineError::TreeNotFound {
                team: team.to_string(),
                player: Some(player.to_string()),
            })
    }
}
