use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ROSTER_ORDER: u32 = 99;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RosterCategory {
    Starter,
    #[default]
    Bench,
    TwoWay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterOrderEntry {
    pub order: u32,
    #[serde(default)]
    pub category: RosterCategory,
}

impl Default for RosterOrderEntry {
    fn default() -> Self {
        Self {
            order: DEFAULT_ROSTER_ORDER,
            category: RosterCategory::Bench,
        }
    }
}

/// Display order for each team's roster, keyed by team then player name.
///
/// Decodes from `{"BOS": {"Derrick White": {"order": 1, "category": "starter"}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterOrderTable {
    teams: HashMap<String, HashMap<String, RosterOrderEntry>>,
}

impl RosterOrderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        team: impl Into<String>,
        player: impl Into<String>,
        entry: RosterOrderEntry,
    ) {
        self.teams
            .entry(team.into())
            .or_default()
            .insert(player.into(), entry);
    }

    pub fn with(
        mut self,
        team: impl Into<String>,
        player: impl Into<String>,
        order: u32,
        category: RosterCategory,
    ) -> Self {
        self.insert(team, player, RosterOrderEntry { order, category });
        self
    }

    /// Entry for a player; unknown players get `{99, bench}`.
    pub fn lookup(&self, team: &str, player: &str) -> RosterOrderEntry {
        match self.teams.get(team).and_then(|players| players.get(player)) {
            Some(entry) => *entry,
            None => {
                debug!(team, player, "no roster order entry, using defaults");
                RosterOrderEntry::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_players_default_to_bench_at_99() {
        let table = RosterOrderTable::new().with("BOS", "Jayson Tatum", 2, RosterCategory::Starter);

        assert_eq!(table.lookup("BOS", "Jayson Tatum").order, 2);
        assert_eq!(table.lookup("BOS", "Jayson Tatum").category, RosterCategory::Starter);
        assert_eq!(table.lookup("BOS", "Nobody"), RosterOrderEntry::default());
        assert_eq!(table.lookup("NYK", "Jayson Tatum").order, DEFAULT_ROSTER_ORDER);
    }

    #[test]
    fn decodes_nested_team_json() {
        let json = r#"{
            "BOS": {
                "Derrick White": {"order": 1, "category": "starter"},
                "Neemias Queta": {"order": 14, "category": "two-way"},
                "Sam Hauser": {"order": 9}
            }
        }"#;
        let table: RosterOrderTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.lookup("BOS", "Neemias Queta").category, RosterCategory::TwoWay);
        assert_eq!(table.lookup("BOS", "Sam Hauser").category, RosterCategory::Bench);
        assert_eq!(table.lookup("BOS", "Derrick White").order, 1);
    }

    #[test]
    fn categories_sort_starters_first() {
        let mut categories = vec![RosterCategory::TwoWay, RosterCategory::Starter, RosterCategory::Bench];
        categories.sort();
        assert_eq!(
            categories,
            vec![RosterCategory::Starter, RosterCategory::Bench, RosterCategory::TwoWay]
        );
    }
}
