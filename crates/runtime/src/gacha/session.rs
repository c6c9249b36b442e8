use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use gacha_common::get_current_timestamp;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::GachaError;
use crate::gacha::{
    Banner, BannerSet, Currency, ItemKind, PityState, PullRecord, PullSize, PullSummary, Rarity, RevealSequence,
    Sampler,
};
use crate::store::{GachaStore, PlayerSnapshot, PullCommit, PullPlanner, Wallet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub player_id: Uuid,
    /// `None` pulls from the default pool.
    pub pool_id: Option<String>,
    pub pull_size: PullSize,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct PullOutcome {
    pub record: PullRecord,
    pub summary: PullSummary,
    pub remaining_currency: i64,
    pub wallet: Wallet,
    pub pity: PityState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerHistory {
    pub pool_id: String,
    pub history: Vec<PullRecord>,
    pub total_pulls: u64,
    pub pity_counter: PityState,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionEntry {
    pub item_id: String,
    /// Absent when the item is no longer in any configured pool.
    pub name: Option<String>,
    pub item_type: Option<ItemKind>,
    pub rarity: Option<Rarity>,
    pub copies: i64,
    pub first_obtained_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerCollection {
    pub items: Vec<CollectionEntry>,
    pub counts: BTreeMap<Rarity, u32>,
    pub total_copies: i64,
}

#[derive(Debug, Clone)]
enum RngSource {
    Entropy,
    /// Every pull derives its own generator from the seed and a running
    /// draw counter, so a replay with the same seed and request order gives
    /// the same results.
    Seeded { seed: u64, pulls: Arc<AtomicU64> },
}

impl RngSource {
    fn next_rng(&self) -> StdRng {
        match self {
            RngSource::Entropy => StdRng::from_rng(&mut rand::rng()),
            RngSource::Seeded { seed, pulls } => {
                let n = pulls.fetch_add(1, Ordering::Relaxed);
                StdRng::seed_from_u64(seed ^ n.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            }
        }
    }
}

/// Entry point for pulls and the player read models built on top of them.
#[derive(Clone)]
pub struct GachaEngine {
    banners: Arc<BannerSet>,
    store: Arc<dyn GachaStore>,
    rng: RngSource,
}

impl GachaEngine {
    pub fn new(banners: BannerSet, store: Arc<dyn GachaStore>) -> Self {
        Self { banners: Arc::new(banners), store, rng: RngSource::Entropy }
    }

    pub fn with_rng_seed(mut self, seed: Option<u64>) -> Self {
        self.rng = match seed {
            Some(seed) => RngSource::Seeded { seed, pulls: Arc::new(AtomicU64::new(0)) },
            None => RngSource::Entropy,
        };
        self
    }

    pub fn banners(&self) -> &BannerSet {
        &self.banners
    }

    pub fn store(&self) -> &Arc<dyn GachaStore> {
        &self.store
    }

    pub fn banner(&self, pool_id: Option<&str>) -> Result<Arc<Banner>, GachaError> {
        self.banners.get(pool_id)
    }

    /// Runs one pull to completion: affordability check, sampling, and an
    /// atomic commit of debit, pity, grants and history.
    ///
    /// The commit runs on its own task. Dropping the returned future (a
    /// client hanging up) does not cancel a pull the store has accepted.
    pub async fn pull(&self, request: PullRequest) -> Result<PullOutcome, GachaError> {
        let banner = self.banners.get(request.pool_id.as_deref())?;
        let PullRequest { player_id, pull_size, currency, .. } = request;
        let cost = banner.rates.cost(pull_size, currency)?;
        let pool_id = banner.id.clone();

        let mut rng = self.rng.next_rng();
        let planner: PullPlanner = Box::new(move |snapshot: &PlayerSnapshot| {
            let available = snapshot.wallet.balance(currency);
            if available < cost {
                return Err(GachaError::InsufficientFunds { currency, required: cost, available });
            }

            let batch = Sampler::new(&banner).sample_batch(pull_size, snapshot.pity, &snapshot.owned, &mut rng)?;
            Ok(PullCommit {
                record: PullRecord {
                    id: Uuid::new_v4(),
                    player_id: snapshot.player_id,
                    pool_id: snapshot.pool_id.clone(),
                    pull_size,
                    currency,
                    cost,
                    results: batch.results,
                    created_at: get_current_timestamp(),
                },
                pity: batch.pity,
            })
        });

        let store = self.store.clone();
        let task_pool = pool_id.clone();
        let receipt = tokio::spawn(async move { store.apply_pull(player_id, &task_pool, planner).await })
            .await
            .map_err(|e| GachaError::Storage(anyhow!("[GachaEngine::pull] pull task failed: {}", e)))??;

        let summary = PullSummary::from_results(&receipt.record.results);
        info!(
            "[GachaEngine::pull] player {} pool {} {} via {} cost {} -> legendary {} epic {} rare {} common {}",
            player_id, pool_id, pull_size, currency, cost,
            summary.legendary, summary.epic, summary.rare, summary.common
        );

        Ok(PullOutcome {
            remaining_currency: receipt.wallet.balance(currency),
            summary,
            wallet: receipt.wallet,
            pity: receipt.pity,
            record: receipt.record,
        })
    }

    /// Reveal pacing for an already committed pull.
    pub async fn reveal(&self, pull_id: Uuid, interval: Duration) -> Result<Option<RevealSequence>, GachaError> {
        Ok(self
            .store
            .find_pull(pull_id)
            .await?
            .map(|record| RevealSequence::new(record.results, interval)))
    }

    /// Recent pulls, newest first. Pity and total count refer to `pool_id`,
    /// or the default pool when none is given.
    pub async fn history(&self, player_id: Uuid, pool_id: Option<&str>, limit: usize) -> Result<PlayerHistory, GachaError> {
        let banner = self.banners.get(pool_id)?;
        let history = self.store.history(player_id, pool_id, limit).await?;
        let total_pulls = self.store.total_pulls(player_id, &banner.id).await?;
        let pity_counter = self.store.pity(player_id, &banner.id).await?;
        Ok(PlayerHistory { pool_id: banner.id.clone(), history, total_pulls, pity_counter })
    }

    pub async fn collection(&self, player_id: Uuid) -> Result<PlayerCollection, GachaError> {
        let owned = self.store.collection(player_id).await?;

        let mut counts: BTreeMap<Rarity, u32> = Rarity::ALL.into_iter().map(|r| (r, 0)).collect();
        let mut total_copies = 0;
        let items = owned
            .into_iter()
            .map(|owned| {
                let item = self.banners.find_item(&owned.item_id);
                if let Some(item) = item {
                    *counts.entry(item.rarity()).or_default() += 1;
                }
                total_copies += owned.copies;
                CollectionEntry {
                    name: item.map(|item| item.name().to_string()),
                    item_type: item.map(|item| item.kind()),
                    rarity: item.map(|item| item.rarity()),
                    item_id: owned.item_id,
                    copies: owned.copies,
                    first_obtained_at: owned.first_obtained_at,
                }
            })
            .collect();

        Ok(PlayerCollection { items, counts, total_copies })
    }

    pub async fn wallet(&self, player_id: Uuid) -> Result<Wallet, GachaError> {
        self.store.wallet(player_id).await
    }

    pub async fn credit(&self, player_id: Uuid, currency: Currency, amount: i64) -> Result<Wallet, GachaError> {
        let wallet = self.store.credit(player_id, currency, amount).await?;
        info!("[GachaEngine::credit] player {} +{} {}", player_id, amount, currency);
        Ok(wallet)
    }
}
