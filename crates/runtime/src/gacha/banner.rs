use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{ConfigError, GachaError};
use crate::gacha::{RateTable, Rarity, RewardItem};

const BUILTIN_BANNERS: &str = include_str!("../../assets/banners.json");

/// A named item set together with the rate table pulls against it use.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rates: RateTable,
    items: Vec<RewardItem>,
}

impl Banner {
    /// Builds and validates a banner.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        rates: RateTable,
        items: Vec<RewardItem>,
    ) -> Result<Self, ConfigError> {
        let banner = Self::from_parts(id, name, description, rates, items);
        banner.validate()?;
        Ok(banner)
    }

    /// Builds a banner without validation. Drawing from it may fail with
    /// `EmptyPool` where `new` would have refused it up front.
    pub fn from_parts(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        rates: RateTable,
        items: Vec<RewardItem>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            rates,
            items,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rates.validate(&self.id)?;

        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id()) {
                return Err(ConfigError::DuplicateItem { pool: self.id.clone(), item: item.id().to_string() });
            }
        }

        for rarity in self.reachable_tiers() {
            if self.tier(rarity).is_empty() {
                return Err(ConfigError::EmptyTier { pool: self.id.clone(), rarity });
            }
        }
        Ok(())
    }

    /// Tiers a pull can land on: everything with weight, plus the pity tiers
    /// and the ten-pull floor, which are produced regardless of weight.
    pub fn reachable_tiers(&self) -> Vec<Rarity> {
        Rarity::ALL
            .into_iter()
            .filter(|r| self.rates.weight(*r) > 0 || *r >= Rarity::Rare)
            .collect()
    }

    pub fn items(&self) -> &[RewardItem] {
        &self.items
    }

    pub fn tier(&self, rarity: Rarity) -> Vec<&RewardItem> {
        self.items.iter().filter(|item| item.rarity() == rarity).collect()
    }

    pub fn find_item(&self, item_id: &str) -> Option<&RewardItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }
}

#[derive(Debug, Deserialize)]
struct BannerFile {
    default_pool: String,
    items: Vec<RewardItem>,
    pools: Vec<PoolEntry>,
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    rates: RateTable,
    item_ids: Vec<String>,
}

/// Every configured pool, keyed by id, plus the pool used when a request
/// names none.
#[derive(Debug, Clone)]
pub struct BannerSet {
    pools: BTreeMap<String, Arc<Banner>>,
    default_pool: String,
}

impl BannerSet {
    pub fn new(banners: Vec<Banner>, default_pool: &str) -> Result<Self, ConfigError> {
        if banners.is_empty() {
            return Err(ConfigError::NoPools);
        }

        let mut pools = BTreeMap::new();
        for banner in banners {
            banner.validate()?;
            let id = banner.id.clone();
            if pools.insert(id.clone(), Arc::new(banner)).is_some() {
                return Err(ConfigError::DuplicatePool(id));
            }
        }

        if !pools.contains_key(default_pool) {
            return Err(ConfigError::MissingDefaultPool(default_pool.to_string()));
        }

        Ok(Self { pools, default_pool: default_pool.to_string() })
    }

    /// The pools shipped with the service.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_BANNERS)
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses the banner file format: an item catalog plus pools that list
    /// catalog ids.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let file: BannerFile = serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let catalog: BTreeMap<&str, &RewardItem> = file.items.iter().map(|item| (item.id(), item)).collect();
        if catalog.len() != file.items.len() {
            let mut seen = HashSet::new();
            let duplicate = file.items.iter().find(|item| !seen.insert(item.id()));
            return Err(ConfigError::DuplicateItem {
                pool: "catalog".to_string(),
                item: duplicate.map(|item| item.id().to_string()).unwrap_or_default(),
            });
        }

        let mut banners = Vec::with_capacity(file.pools.len());
        for pool in file.pools {
            let mut items = Vec::with_capacity(pool.item_ids.len());
            for item_id in &pool.item_ids {
                let item = catalog.get(item_id.as_str()).ok_or_else(|| ConfigError::UnknownItem {
                    pool: pool.id.clone(),
                    item: item_id.clone(),
                })?;
                items.push((*item).clone());
            }
            banners.push(Banner::from_parts(pool.id, pool.name, pool.description, pool.rates, items));
        }

        Self::new(banners, &file.default_pool)
    }

    /// Loads `path` when given, the built-in pools otherwise, and applies a
    /// default-pool override.
    pub fn load(path: Option<&str>, default_pool: Option<&str>) -> Result<Self, ConfigError> {
        let set = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::builtin()?,
        };
        match default_pool {
            Some(pool) => set.with_default_pool(pool),
            None => Ok(set),
        }
    }

    pub fn with_default_pool(mut self, pool_id: &str) -> Result<Self, ConfigError> {
        if !self.pools.contains_key(pool_id) {
            return Err(ConfigError::MissingDefaultPool(pool_id.to_string()));
        }
        self.default_pool = pool_id.to_string();
        Ok(self)
    }

    pub fn default_pool(&self) -> &str {
        &self.default_pool
    }

    /// Resolves a requested pool, falling back to the default one.
    pub fn get(&self, pool_id: Option<&str>) -> Result<Arc<Banner>, GachaError> {
        let pool_id = pool_id.unwrap_or(&self.default_pool);
        self.pools
            .get(pool_id)
            .cloned()
            .ok_or_else(|| GachaError::UnknownPool(pool_id.to_string()))
    }

    pub fn pools(&self) -> impl Iterator<Item = &Arc<Banner>> {
        self.pools.values()
    }

    /// Looks an item up across every pool.
    pub fn find_item(&self, item_id: &str) -> Option<&RewardItem> {
        self.pools.values().find_map(|banner| banner.find_item(item_id))
    }
}
