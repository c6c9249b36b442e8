use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gacha::{Currency, ItemKind, PullSize, Rarity};

/// Why a draw did not come from the plain weighted roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guarantee {
    LegendaryPity,
    EpicPity,
    /// Last slot of a ten-pull lifted to rare because the other nine were common.
    TenPullFloor,
}

/// One reward out of a pull. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResult {
    pub slot: usize,
    #[serde(rename = "id")]
    pub item_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemKind,
    pub name: String,
    pub rarity: Rarity,
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantee: Option<Guarantee>,
}

/// An accepted pull as persisted, results in draw order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRecord {
    pub id: Uuid,
    pub player_id: Uuid,
    pub pool_id: String,
    pub pull_size: PullSize,
    pub currency: Currency,
    pub cost: i64,
    pub results: Vec<PullResult>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullSummary {
    pub legendary: u32,
    pub epic: u32,
    pub rare: u32,
    pub common: u32,
    pub new_hunters: u32,
    pub new_weapons: u32,
    pub duplicates: u32,
}

impl PullSummary {
    pub fn from_results(results: &[PullResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.rarity {
                Rarity::Legendary => summary.legendary += 1,
                Rarity::Epic => summary.epic += 1,
                Rarity::Rare => summary.rare += 1,
                Rarity::Common => summary.common += 1,
            }
            match (result.is_new, result.item_type) {
                (true, ItemKind::Hunter) => summary.new_hunters += 1,
                (true, ItemKind::Weapon) => summary.new_weapons += 1,
                (false, _) => summary.duplicates += 1,
            }
        }
        summary
    }

    pub fn count(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Legendary => self.legendary,
            Rarity::Epic => self.epic,
            Rarity::Rare => self.rare,
            Rarity::Common => self.common,
        }
    }
}
