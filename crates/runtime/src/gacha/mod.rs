use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

mod banner;
mod item;
mod pity;
mod rate_table;
mod record;
mod reveal;
mod sampler;
mod session;

pub use banner::{Banner, BannerSet};
pub use item::{HunterItem, HunterStats, ItemBase, ItemKind, RewardItem, WeaponItem, WeaponStats};
pub use pity::{must_force, record_outcome, PityState};
pub use rate_table::RateTable;
pub use record::{Guarantee, PullRecord, PullResult, PullSummary};
pub use reveal::{RevealSequence, RevealStep};
pub use sampler::{Batch, Draw, Sampler};
pub use session::{CollectionEntry, GachaEngine, PlayerCollection, PlayerHistory, PullOutcome, PullRequest};

/// Reward quality buckets, ordered from worst to best so `>=` reads as
/// "this tier or better".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::Common, Rarity::Rare, Rarity::Epic, Rarity::Legendary];

    /// Order in which cumulative weights are walked during a weighted draw:
    /// rarest tier first.
    pub const SAMPLING_ORDER: [Rarity; 4] = [Rarity::Legendary, Rarity::Epic, Rarity::Rare, Rarity::Common];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "common" => Ok(Rarity::Common),
            "rare" => Ok(Rarity::Rare),
            "epic" => Ok(Rarity::Epic),
            "legendary" => Ok(Rarity::Legendary),
            other => Err(anyhow!("unknown rarity {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Gems,
    Tickets,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::Gems, Currency::Tickets];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Gems => "gems",
            Currency::Tickets => "tickets",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gems" => Ok(Currency::Gems),
            "tickets" => Ok(Currency::Tickets),
            other => Err(anyhow!("unknown currency {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum PullSize {
    #[default]
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "ten", alias = "multi", alias = "ten_pull")]
    Ten,
}

impl PullSize {
    pub const ALL: [PullSize; 2] = [PullSize::Single, PullSize::Ten];

    /// Number of individual draws in one request of this size.
    pub fn count(&self) -> usize {
        match self {
            PullSize::Single => 1,
            PullSize::Ten => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PullSize::Single => "single",
            PullSize::Ten => "ten",
        }
    }
}

impl fmt::Display for PullSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PullSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(PullSize::Single),
            "ten" | "multi" | "ten_pull" => Ok(PullSize::Ten),
            other => Err(anyhow!("unknown pull size {:?}", other)),
        }
    }
}

/// Key of the cost map, rendered as `single_pull_gems`, `ten_pull_tickets`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CostKey {
    pub pull_size: PullSize,
    pub currency: Currency,
}

impl CostKey {
    pub fn new(pull_size: PullSize, currency: Currency) -> Self {
        Self { pull_size, currency }
    }

    /// Every combination a client may request.
    pub fn all() -> impl Iterator<Item = CostKey> {
        PullSize::ALL
            .into_iter()
            .flat_map(|size| Currency::ALL.into_iter().map(move |currency| CostKey::new(size, currency)))
    }
}

impl fmt::Display for CostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_pull_{}", self.pull_size, self.currency)
    }
}

impl FromStr for CostKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (size, currency) = s
            .split_once("_pull_")
            .ok_or_else(|| anyhow!("cost key {:?} is not of the form <size>_pull_<currency>", s))?;
        Ok(CostKey::new(size.parse()?, currency.parse()?))
    }
}

impl TryFrom<String> for CostKey {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CostKey> for String {
    fn from(key: CostKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_order_reads_as_or_better() {
        assert!(Rarity::Legendary > Rarity::Epic);
        assert!(Rarity::Epic > Rarity::Rare);
        assert!(Rarity::Rare > Rarity::Common);
        assert_eq!(Rarity::SAMPLING_ORDER[0], Rarity::Legendary);
    }

    #[test]
    fn test_pull_size_accepts_client_aliases() {
        let ten: PullSize = serde_json::from_str("\"multi\"").unwrap();
        assert_eq!(ten, PullSize::Ten);
        let ten: PullSize = serde_json::from_str("\"ten_pull\"").unwrap();
        assert_eq!(ten, PullSize::Ten);
        assert_eq!(serde_json::to_string(&PullSize::Ten).unwrap(), "\"ten\"");
    }

    #[test]
    fn test_cost_key_text_form() {
        let key = CostKey::new(PullSize::Ten, Currency::Tickets);
        assert_eq!(key.to_string(), "ten_pull_tickets");
        assert_eq!("single_pull_gems".parse::<CostKey>().unwrap(), CostKey::new(PullSize::Single, Currency::Gems));
        assert!("gems_single".parse::<CostKey>().is_err());
        assert_eq!(CostKey::all().count(), 4);
    }
}
