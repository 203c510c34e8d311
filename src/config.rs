use std::path::PathBuf;
use std::time::Duration;

use crate::layout::{Direction, LayoutConfig};

const DATA_DIR_DEFAULT: &str = "data/acquisition-trees";
const LAYOUT_BUDGET_MS_DEFAULT: u64 = 250;
const LOG_FILTER_DEFAULT: &str = "warn";

/// Runtime settings, read from `ROSTERDNA_*` environment variables with
/// fallbacks for anything unset or unparseable.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub layout_budget: Duration,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl EngineConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_dir: PathBuf::from(
                lookup("ROSTERDNA_DATA_DIR").unwrap_or_else(|| DATA_DIR_DEFAULT.to_string()),
            ),
            layout_budget: Duration::from_millis(
                lookup("ROSTERDNA_LAYOUT_BUDGET_MS")
                    .and_then(|raw| raw.trim().parse().ok())
                    .unwrap_or(LAYOUT_BUDGET_MS_DEFAULT),
            ),
            log_filter: lookup("ROSTERDNA_LOG")
                .filter(|raw| !raw.trim().is_empty())
                .unwrap_or_else(|| LOG_FILTER_DEFAULT.to_string()),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn layout_config(&self, direction: Direction) -> LayoutConfig {
        LayoutConfig::new(direction).with_budget(self.layout_budget)
    }
}
