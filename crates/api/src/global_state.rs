use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gacha_clients::PostgresClient;
use gacha_common::{EnvVars, ModuleClient};
use gacha_runtime::{BannerSet, GachaEngine, GachaEnv, GachaStore, MemoryStore, PostgresStore};

use crate::env::{ApiServerEnv, StoreKind};

#[derive(Clone)]
pub struct GlobalState {
    pub engine: GachaEngine,
    pub reveal_interval: Duration,
}

impl GlobalState {
    pub fn new(engine: GachaEngine, reveal_interval: Duration) -> Self {
        Self { engine, reveal_interval }
    }

    /// Builds the engine from the environment. Banner configuration errors
    /// abort here, before the server binds.
    pub async fn from_env() -> Result<Self> {
        let api_env = ApiServerEnv::load()?;
        let gacha_env = GachaEnv::load()?;

        let banners = BannerSet::load(gacha_env.banners_path.as_deref(), gacha_env.default_pool.as_deref())?;
        tracing::info!(
            "[GlobalState::from_env] loaded {} pools, default {}",
            banners.pools().count(), banners.default_pool()
        );

        let store: Arc<dyn GachaStore> = match api_env.store {
            StoreKind::Memory => Arc::new(MemoryStore::new(gacha_env.lock_timeout)),
            StoreKind::Postgres => {
                let db = PostgresClient::setup_connection().await?;
                let pool = db.get_client().as_ref().clone();
                Arc::new(PostgresStore::new(pool, gacha_env.lock_timeout))
            }
        };
        tracing::info!("[GlobalState::from_env] using {} store", store.name());

        let engine = GachaEngine::new(banners, store).with_rng_seed(gacha_env.rng_seed);
        Ok(Self::new(engine, gacha_env.reveal_interval))
    }
}
