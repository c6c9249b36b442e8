use thiserror::Error;

use crate::gacha::{CostKey, Currency, Rarity};

/// Problems found while loading banner configuration. Always fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("banner config could not be parsed: {0}")]
    Parse(String),
    #[error("banner config could not be read from {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("no pools configured")]
    NoPools,
    #[error("pool {0} is configured more than once")]
    DuplicatePool(String),
    #[error("default pool {0} is not configured")]
    MissingDefaultPool(String),

    #[error("pool {pool}: total rarity weight is zero")]
    ZeroTotalWeight { pool: String },
    #[error("pool {pool}: {rarity} pity threshold must be at least 1")]
    InvalidThreshold { pool: String, rarity: Rarity },
    #[error("pool {pool}: {rarity} is referenced by a pity rule but has no weight entry")]
    MissingPityTier { pool: String, rarity: Rarity },
    #[error("pool {pool}: no cost configured for {key}")]
    MissingCost { pool: String, key: CostKey },
    #[error("pool {pool}: cost for {key} is negative")]
    NegativeCost { pool: String, key: CostKey },
    #[error("pool {pool}: {rarity} can be drawn but has no items")]
    EmptyTier { pool: String, rarity: Rarity },
    #[error("pool {pool}: item {item} is listed more than once")]
    DuplicateItem { pool: String, item: String },
    #[error("pool {pool}: item {item} is not in the item catalog")]
    UnknownItem { pool: String, item: String },
}

#[derive(Debug, Error)]
pub enum GachaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("insufficient {currency}: {required} required, {available} available")]
    InsufficientFunds {
        currency: Currency,
        required: i64,
        available: i64,
    },

    #[error("pool {pool} has no {rarity} items to draw")]
    EmptyPool { pool: String, rarity: Rarity },

    #[error("another pull for this player and pool is in progress, retry the pull")]
    ConcurrencyConflict,

    #[error("unknown pool {0}")]
    UnknownPool(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl GachaError {
    /// The caller may re-issue the same pull and expect it to go through.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GachaError::ConcurrencyConflict)
    }

    /// Errors that indicate broken configuration rather than a bad request.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, GachaError::Config(_) | GachaError::EmptyPool { .. })
    }
}
