use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GachaError};
use crate::gacha::{CostKey, Currency, PullSize, Rarity};

/// Drop weights, prices and pity thresholds of one pool. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    /// Relative weights; they are normalized at sampling time and need not sum to 100.
    pub weights: BTreeMap<Rarity, u32>,
    pub costs: BTreeMap<CostKey, i64>,

    pub legendary_pity_threshold: u32,
    pub epic_pity_threshold: u32,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Rarity::Legendary, 1),
                (Rarity::Epic, 5),
                (Rarity::Rare, 20),
                (Rarity::Common, 74),
            ]),
            costs: BTreeMap::from([
                (CostKey::new(PullSize::Single, Currency::Gems), 100),
                (CostKey::new(PullSize::Ten, Currency::Gems), 900),
                (CostKey::new(PullSize::Single, Currency::Tickets), 1),
                (CostKey::new(PullSize::Ten, Currency::Tickets), 9),
            ]),
            legendary_pity_threshold: 100,
            epic_pity_threshold: 20,
        }
    }
}

impl RateTable {
    pub fn validate(&self, pool: &str) -> Result<(), ConfigError> {
        if self.total_weight() == 0 {
            return Err(ConfigError::ZeroTotalWeight { pool: pool.to_string() });
        }

        for (rarity, threshold) in [
            (Rarity::Legendary, self.legendary_pity_threshold),
            (Rarity::Epic, self.epic_pity_threshold),
        ] {
            if threshold == 0 {
                return Err(ConfigError::InvalidThreshold { pool: pool.to_string(), rarity });
            }
            if !self.weights.contains_key(&rarity) {
                return Err(ConfigError::MissingPityTier { pool: pool.to_string(), rarity });
            }
        }

        for key in CostKey::all() {
            match self.costs.get(&key) {
                None => return Err(ConfigError::MissingCost { pool: pool.to_string(), key }),
                Some(cost) if *cost < 0 => return Err(ConfigError::NegativeCost { pool: pool.to_string(), key }),
                Some(_) => {}
            }
        }

        Ok(())
    }

    pub fn weight(&self, rarity: Rarity) -> u32 {
        self.weights.get(&rarity).copied().unwrap_or(0)
    }

    pub fn total_weight(&self) -> u64 {
        self.weights.values().map(|w| *w as u64).sum()
    }

    /// Share of `rarity` in percent, before any pity forcing.
    pub fn probability_percent(&self, rarity: Rarity) -> f64 {
        let total = self.total_weight();
        if total == 0 {
            return 0.0;
        }
        self.weight(rarity) as f64 * 100.0 / total as f64
    }

    /// Tiers that a weighted draw can produce.
    pub fn drawable(&self) -> impl Iterator<Item = Rarity> + '_ {
        Rarity::ALL.into_iter().filter(|r| self.weight(*r) > 0)
    }

    pub fn cost(&self, pull_size: PullSize, currency: Currency) -> Result<i64, GachaError> {
        let key = CostKey::new(pull_size, currency);
        self.costs.get(&key).copied().ok_or_else(|| {
            GachaError::InvalidRequest(format!("{} is not priced in this pool", key))
        })
    }
}
