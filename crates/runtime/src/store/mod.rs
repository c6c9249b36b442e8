use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GachaError;
use crate::gacha::{Currency, PityState, PullRecord};

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{InventoryRow, PityRow, PostgresStore, PullRow, WalletRow};

/// Currency balances of one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub gems: i64,
    pub tickets: i64,
}

impl Wallet {
    pub fn new(gems: i64, tickets: i64) -> Self {
        Self { gems, tickets }
    }

    pub fn balance(&self, currency: Currency) -> i64 {
        match currency {
            Currency::Gems => self.gems,
            Currency::Tickets => self.tickets,
        }
    }

    fn slot(&mut self, currency: Currency) -> &mut i64 {
        match currency {
            Currency::Gems => &mut self.gems,
            Currency::Tickets => &mut self.tickets,
        }
    }

    /// Removes `amount` when the balance covers it. Returns false and leaves
    /// the wallet untouched otherwise.
    pub fn debit(&mut self, currency: Currency, amount: i64) -> bool {
        let slot = self.slot(currency);
        if *slot < amount {
            return false;
        }
        *slot -= amount;
        true
    }

    pub fn credit(&mut self, currency: Currency, amount: i64) {
        let slot = self.slot(currency);
        *slot = slot.saturating_add(amount);
    }
}

/// An inventory entry: how many copies of an item a player holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub item_id: String,
    pub copies: i64,
    pub first_obtained_at: i64,
}

/// What a pull gets to see of the player, read under the pull's lock.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub player_id: Uuid,
    pub pool_id: String,
    pub wallet: Wallet,
    pub pity: PityState,
    pub owned: HashSet<String>,
}

/// Everything a pull writes. The debit is `record.cost` in `record.currency`
/// and the grants are `record.results`.
#[derive(Debug, Clone)]
pub struct PullCommit {
    pub record: PullRecord,
    pub pity: PityState,
}

/// State after a committed pull.
#[derive(Debug, Clone)]
pub struct PullReceipt {
    pub record: PullRecord,
    pub wallet: Wallet,
    pub pity: PityState,
}

/// Turns a snapshot into the writes of one pull. Runs while the store holds
/// the (player, pool) lock; an error aborts the pull with nothing written.
pub type PullPlanner = Box<dyn FnOnce(&PlayerSnapshot) -> Result<PullCommit, GachaError> + Send>;

/// Persistence behind the engine. `apply_pull` is the only write path for
/// pulls and must make the debit, pity update, grants and history record
/// visible together or not at all.
#[async_trait]
pub trait GachaStore: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Serializes against other pulls of the same player and pool, snapshots
    /// state, runs `planner` and commits its output atomically.
    async fn apply_pull(&self, player_id: Uuid, pool_id: &str, planner: PullPlanner) -> Result<PullReceipt, GachaError>;

    async fn wallet(&self, player_id: Uuid) -> Result<Wallet, GachaError>;

    async fn balance(&self, player_id: Uuid, currency: Currency) -> Result<i64, GachaError> {
        Ok(self.wallet(player_id).await?.balance(currency))
    }

    async fn credit(&self, player_id: Uuid, currency: Currency, amount: i64) -> Result<Wallet, GachaError>;

    async fn pity(&self, player_id: Uuid, pool_id: &str) -> Result<PityState, GachaError>;

    async fn owns(&self, player_id: Uuid, item_id: &str) -> Result<bool, GachaError>;

    async fn collection(&self, player_id: Uuid) -> Result<Vec<OwnedItem>, GachaError>;

    /// Most recent first.
    async fn history(&self, player_id: Uuid, pool_id: Option<&str>, limit: usize) -> Result<Vec<PullRecord>, GachaError>;

    async fn total_pulls(&self, player_id: Uuid, pool_id: &str) -> Result<u64, GachaError>;

    async fn find_pull(&self, pull_id: Uuid) -> Result<Option<PullRecord>, GachaError>;
}
