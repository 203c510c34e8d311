use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the acquisition graph engine and its data adapters.
///
/// Conditions the engine recovers from on its own (a graph without any dated
/// node, a layout that falls back to columns, a player missing from the
/// roster order table) are deliberately not represented here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A transaction tree is missing a required field; the whole tree is rejected.
    #[error("malformed tree #{tree} at {path}: {reason}")]
    MalformedInput {
        tree: usize,
        path: String,
        reason: String,
    },

    /// No source tree exists for the requested team or player.
    #[error("{}", not_found_message(.team, .player.as_deref()))]
    TreeNotFound {
        team: String,
        player: Option<String>,
    },

    /// A query referenced a node id that is not part of the graph.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("failed to read '{}'", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode '{}'", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn not_found_message(team: &str, player: Option<&str>) -> String {
    match player {
        Some(player) => format!("acquisition tree not found for {player} ({team})"),
        None => format!("no acquisition trees found for team {team}"),
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages_mention_team_and_player() {
        let team_only = EngineError::TreeNotFound {
            team: "BOS".to_string(),
            player: None,
        };
        assert_eq!(team_only.to_string(), "no acquisition trees found for team BOS");

        let player = EngineError::TreeNotFound {
            team: "BOS".to_string(),
            player: Some("jayson-tatum".to_string()),
        };
        assert!(player.to_string().contains("jayson-tatum"));
        assert!(player.to_string().contains("BOS"));
    }
}
