use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::GachaError;
use crate::gacha::{Currency, PityState, PullRecord};
use crate::store::{GachaStore, OwnedItem, PlayerSnapshot, PullPlanner, PullReceipt, Wallet};

type LockKey = (Uuid, String);

#[derive(Default)]
struct MemoryState {
    wallets: HashMap<Uuid, Wallet>,
    pity: HashMap<LockKey, PityState>,
    inventory: HashMap<Uuid, HashMap<String, OwnedItem>>,
    pulls: Vec<PullRecord>,
}

/// Process-local store. Pulls of one (player, pool) are serialized by a
/// keyed async lock; every read and write of the data itself happens under
/// a single short-lived mutex, so wallet updates from pulls on different
/// pools never interleave.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
    lock_timeout: Duration,
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            locks: Mutex::new(HashMap::new()),
            lock_timeout,
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, GachaError> {
        self.state
            .lock()
            .map_err(|_| GachaError::Storage(anyhow!("[MemoryStore] state mutex poisoned")))
    }

    async fn acquire(&self, player_id: Uuid, pool_id: &str) -> Result<OwnedMutexGuard<()>, GachaError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| GachaError::Storage(anyhow!("[MemoryStore] lock registry poisoned")))?;
            locks
                .entry((player_id, pool_id.to_string()))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        match tokio::time::timeout(self.lock_timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(
                    "[MemoryStore::acquire] timed out after {:?} waiting on player {} pool {}",
                    self.lock_timeout, player_id, pool_id
                );
                Err(GachaError::ConcurrencyConflict)
            }
        }
    }

    fn snapshot(&self, player_id: Uuid, pool_id: &str) -> Result<PlayerSnapshot, GachaError> {
        let state = self.state()?;
        Ok(PlayerSnapshot {
            player_id,
            pool_id: pool_id.to_string(),
            wallet: state.wallets.get(&player_id).copied().unwrap_or_default(),
            pity: state.pity.get(&(player_id, pool_id.to_string())).copied().unwrap_or_default(),
            owned: state
                .inventory
                .get(&player_id)
                .map(|items| items.keys().cloned().collect())
                .unwrap_or_default(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

#[async_trait]
impl GachaStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn apply_pull(&self, player_id: Uuid, pool_id: &str, planner: PullPlanner) -> Result<PullReceipt, GachaError> {
        let _guard = self.acquire(player_id, pool_id).await?;

        let snapshot = self.snapshot(player_id, pool_id)?;
        let commit = planner(&snapshot)?;
        let mut record = commit.record;

        let mut state = self.state()?;

        // A pull on another pool may have spent from the same wallet since
        // the snapshot was taken.
        let mut wallet = state.wallets.get(&player_id).copied().unwrap_or_default();
        if !wallet.debit(record.currency, record.cost) {
            return Err(GachaError::InsufficientFunds {
                currency: record.currency,
                required: record.cost,
                available: wallet.balance(record.currency),
            });
        }
        state.wallets.insert(player_id, wallet);
        state.pity.insert((player_id, pool_id.to_string()), commit.pity);

        // `owned` in the snapshot is only guarded by this pool's lock; grants
        // from another pool may have landed since, so newness is settled here.
        let created_at = record.created_at;
        let inventory = state.inventory.entry(player_id).or_default();
        for result in record.results.iter_mut() {
            result.is_new = !inventory.contains_key(&result.item_id);
            inventory
                .entry(result.item_id.clone())
                .and_modify(|owned| owned.copies += 1)
                .or_insert_with(|| OwnedItem {
                    item_id: result.item_id.clone(),
                    copies: 1,
                    first_obtained_at: created_at,
                });
        }
        state.pulls.push(record.clone());

        Ok(PullReceipt { record, wallet, pity: commit.pity })
    }

    async fn wallet(&self, player_id: Uuid) -> Result<Wallet, GachaError> {
        Ok(self.state()?.wallets.get(&player_id).copied().unwrap_or_default())
    }

    async fn credit(&self, player_id: Uuid, currency: Currency, amount: i64) -> Result<Wallet, GachaError> {
        if amount < 0 {
            return Err(GachaError::InvalidRequest(format!("credit amount must not be negative, got {}", amount)));
        }
        let mut state = self.state()?;
        let wallet = state.wallets.entry(player_id).or_default();
        wallet.credit(currency, amount);
        Ok(*wallet)
    }

    async fn pity(&self, player_id: Uuid, pool_id: &str) -> Result<PityState, GachaError> {
        Ok(self
            .state()?
            .pity
            .get(&(player_id, pool_id.to_string()))
            .copied()
            .unwrap_or_default())
    }

    async fn owns(&self, player_id: Uuid, item_id: &str) -> Result<bool, GachaError> {
        Ok(self
            .state()?
            .inventory
            .get(&player_id)
            .is_some_and(|items| items.contains_key(item_id)))
    }

    async fn collection(&self, player_id: Uuid) -> Result<Vec<OwnedItem>, GachaError> {
        let state = self.state()?;
        let mut items: Vec<OwnedItem> = state
            .inventory
            .get(&player_id)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default();
        items.sort_by(|a, b| a.first_obtained_at.cmp(&b.first_obtained_at).then_with(|| a.item_id.cmp(&b.item_id)));
        Ok(items)
    }

    async fn history(&self, player_id: Uuid, pool_id: Option<&str>, limit: usize) -> Result<Vec<PullRecord>, GachaError> {
        let state = self.state()?;
        Ok(state
            .pulls
            .iter()
            .rev()
            .filter(|record| record.player_id == player_id)
            .filter(|record| pool_id.map_or(true, |pool| record.pool_id == pool))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn total_pulls(&self, player_id: Uuid, pool_id: &str) -> Result<u64, GachaError> {
        let state = self.state()?;
        Ok(state
            .pulls
            .iter()
            .filter(|record| record.player_id == player_id && record.pool_id == pool_id)
            .map(|record| record.results.len() as u64)
            .sum())
    }

    async fn find_pull(&self, pull_id: Uuid) -> Result<Option<PullRecord>, GachaError> {
        Ok(self.state()?.pulls.iter().find(|record| record.id == pull_id).cloned())
    }
}
