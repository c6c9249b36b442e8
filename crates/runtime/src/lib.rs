mod env;
mod error;
mod gacha;
mod store;

pub use env::GachaEnv;
pub use error::{ConfigError, GachaError};
pub use gacha::{
    must_force, record_outcome, Banner, BannerSet, Batch, CollectionEntry, CostKey, Currency, Draw, GachaEngine,
    Guarantee, HunterItem, HunterStats, ItemBase, ItemKind, PityState, PlayerCollection, PlayerHistory, PullOutcome,
    PullRecord, PullRequest, PullResult, PullSize, PullSummary, RateTable, Rarity, RevealSequence, RevealStep,
    RewardItem, Sampler, WeaponItem, WeaponStats,
};
pub use store::{GachaStore, MemoryStore, OwnedItem, PlayerSnapshot, PullCommit, PullPlanner, PullReceipt, Wallet};

#[cfg(feature = "postgres")]
pub use store::{InventoryRow, PityRow, PostgresStore, PullRow, WalletRow};
