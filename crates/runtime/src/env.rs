use std::time::Duration;

use anyhow::Result;
use gacha_common::{env_or, env_parse_or, EnvVars};

/// Engine settings read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GachaEnv {
    pub banners_path: Option<String>,
    pub default_pool: Option<String>,
    pub lock_timeout: Duration,
    pub reveal_interval: Duration,
    pub rng_seed: Option<u64>,
}

impl Default for GachaEnv {
    fn default() -> Self {
        Self {
            banners_path: None,
            default_pool: None,
            lock_timeout: Duration::from_millis(2000),
            reveal_interval: Duration::from_millis(800),
            rng_seed: None,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    Some(env_or(key, "")).filter(|value| !value.is_empty())
}

impl EnvVars for GachaEnv {
    fn load() -> Result<Self> {
        let rng_seed = match optional("GACHA_RNG_SEED") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("[GachaEnv::load] GACHA_RNG_SEED has an invalid value {:?}: {}", raw, e)
            })?),
            None => None,
        };

        Ok(Self {
            banners_path: optional("GACHA_BANNERS_PATH"),
            default_pool: optional("GACHA_DEFAULT_POOL"),
            lock_timeout: Duration::from_millis(env_parse_or("GACHA_LOCK_TIMEOUT_MS", 2000u64)?),
            reveal_interval: Duration::from_millis(env_parse_or("GACHA_REVEAL_INTERVAL_MS", 800u64)?),
            rng_seed,
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "GACHA_BANNERS_PATH" => self.banners_path.clone(),
            "GACHA_DEFAULT_POOL" => self.default_pool.clone(),
            "GACHA_LOCK_TIMEOUT_MS" => Some(self.lock_timeout.as_millis().to_string()),
            "GACHA_REVEAL_INTERVAL_MS" => Some(self.reveal_interval.as_millis().to_string()),
            "GACHA_RNG_SEED" => self.rng_seed.map(|seed| seed.to_string()),
            _ => None,
        }
    }
}
