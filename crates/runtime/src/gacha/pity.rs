use serde::{Deserialize, Serialize};

use crate::gacha::{RateTable, Rarity};

/// Guarantee counters of one player in one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityState {
    pub pulls_since_epic: u32,
    pub pulls_since_legendary: u32,
}

/// Counter update after a single draw produced `rarity`.
///
/// A legendary clears both counters, an epic clears only the epic counter,
/// anything else advances both.
pub fn record_outcome(state: PityState, rarity: Rarity) -> PityState {
    match rarity {
        Rarity::Legendary => PityState::default(),
        Rarity::Epic => PityState {
            pulls_since_epic: 0,
            pulls_since_legendary: state.pulls_since_legendary.saturating_add(1),
        },
        Rarity::Rare | Rarity::Common => PityState {
            pulls_since_epic: state.pulls_since_epic.saturating_add(1),
            pulls_since_legendary: state.pulls_since_legendary.saturating_add(1),
        },
    }
}

/// The rarity the next draw must produce, if a threshold is reached.
///
/// Thresholds are inclusive: with a threshold of 100 and 99 dry pulls the
/// next pull is the 100th and is forced. Legendary wins when both apply.
pub fn must_force(state: &PityState, table: &RateTable) -> Option<Rarity> {
    if state.pulls_since_legendary.saturating_add(1) >= table.legendary_pity_threshold {
        Some(Rarity::Legendary)
    } else if state.pulls_since_epic.saturating_add(1) >= table.epic_pity_threshold {
        Some(Rarity::Epic)
    } else {
        None
    }
}
