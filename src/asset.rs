use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Asset category as written in tree files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawAssetType {
    #[default]
    Player,
    Pick,
    Cash,
    #[serde(other)]
    Other,
}

/// How an asset changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionType {
    Draft,
    DraftNightTrade,
    Trade,
    SignAndTrade,
    #[serde(alias = "signing")]
    FreeAgent,
    Undrafted,
    Waiver,
    Original,
    #[serde(other)]
    Other,
}

impl AcquisitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionType::Draft => "draft",
            AcquisitionType::DraftNightTrade => "draft-night-trade",
            AcquisitionType::Trade => "trade",
            AcquisitionType::SignAndTrade => "sign-and-trade",
            AcquisitionType::FreeAgent => "free-agent",
            AcquisitionType::Undrafted => "undrafted",
            AcquisitionType::Waiver => "waiver",
            AcquisitionType::Original => "original",
            AcquisitionType::Other => "other",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, AcquisitionType::Draft | AcquisitionType::DraftNightTrade)
    }

    /// Any transaction that involved another team.
    pub fn is_trade(&self) -> bool {
        matches!(
            self,
            AcquisitionType::Trade | AcquisitionType::SignAndTrade | AcquisitionType::DraftNightTrade
        )
    }

    /// Direct signings where the player's first team can be the current team.
    pub fn is_direct_signing(&self) -> bool {
        matches!(
            self,
            AcquisitionType::Undrafted | AcquisitionType::FreeAgent | AcquisitionType::Original
        )
    }
}

/// One record of a per-player transaction tree: the asset that was acquired
/// and, recursively, everything surrendered to acquire it.
///
/// Fields not listed here (for example a player's onward `tradeChain`) are
/// ignored on decode; they are not part of the acquisition cost graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetNode {
    #[serde(rename = "type", default)]
    pub asset_type: RawAssetType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_type: Option<AcquisitionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_partner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_pick: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub became_player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_origin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_homegrown: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets_given_up: Vec<AssetNode>,
}

impl AssetNode {
    pub fn new(asset_type: RawAssetType, name: impl Into<String>) -> Self {
        Self {
            asset_type,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn player(name: impl Into<String>) -> Self {
        Self::new(RawAssetType::Player, name)
    }

    pub fn pick(name: impl Into<String>) -> Self {
        Self::new(RawAssetType::Pick, name)
    }

    pub fn acquired(mut self, acquisition: AcquisitionType, date: impl Into<String>) -> Self {
        self.acquisition_type = Some(acquisition);
        self.date = Some(date.into());
        self
    }

    pub fn via(mut self, partner: impl Into<String>) -> Self {
        self.trade_partner = Some(partner.into());
        self
    }

    pub fn giving_up(mut self, assets: impl IntoIterator<Item = AssetNode>) -> Self {
        self.assets_given_up.extend(assets);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.assets_given_up.is_empty()
    }

    /// Checks every record of the tree before any of it is ingested.
    ///
    /// A missing or blank `name` anywhere rejects the whole tree: dropping a
    /// single record would silently shorten a real acquisition chain.
    pub fn validate(&self, tree: usize) -> Result<()> {
        self.validate_at(tree, "tree".to_string())
    }

    fn validate_at(&self, tree: usize, path: String) -> Result<()> {
        let name_present = self
            .name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        if !name_present {
            return Err(EngineError::MalformedInput {
                tree,
                path,
                reason: "asset is missing a name".to_string(),
            });
        }

        for (idx, child) in self.assets_given_up.iter().enumerate() {
            child.validate_at(tree, format!("{path}.assetsGivenUp[{idx}]"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMeta {
    pub team: String,
    pub player: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// A stored tree file: metadata plus the roster player's tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeFile {
    #[serde(rename = "_meta")]
    pub meta: TreeMeta,
    pub tree: AssetNode,
}
