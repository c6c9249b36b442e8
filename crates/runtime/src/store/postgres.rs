use std::collections::HashSet;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use gacha_common::get_current_timestamp;
use gacha_database::{is_retryable_conflict, SqlxSchema};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::GachaError;
use crate::gacha::{Currency, PityState, PullRecord, PullResult};
use crate::store::{GachaStore, OwnedItem, PlayerSnapshot, PullPlanner, PullReceipt, Wallet};

#[derive(Debug, Clone, FromRow)]
pub struct WalletRow {
    pub player_id: Uuid,
    pub gems: i64,
    pub tickets: i64,
    pub updated_at: i64,
}

impl SqlxSchema for WalletRow {
    const TABLE_NAME: &'static str = "gacha_wallets";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        r#"
            CREATE TABLE IF NOT EXISTS gacha_wallets (
                player_id UUID PRIMARY KEY,
                gems BIGINT NOT NULL DEFAULT 0 CHECK (gems >= 0),
                tickets BIGINT NOT NULL DEFAULT 0 CHECK (tickets >= 0),
                updated_at BIGINT NOT NULL
            )
        "#
        .to_string()
    }
}

impl From<WalletRow> for Wallet {
    fn from(row: WalletRow) -> Self {
        Wallet::new(row.gems, row.tickets)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PityRow {
    pub player_id: Uuid,
    pub pool_id: String,
    pub pulls_since_epic: i64,
    pub pulls_since_legendary: i64,
    pub updated_at: i64,
}

impl SqlxSchema for PityRow {
    const TABLE_NAME: &'static str = "gacha_pity";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        r#"
            CREATE TABLE IF NOT EXISTS gacha_pity (
                player_id UUID NOT NULL,
                pool_id TEXT NOT NULL,
                pulls_since_epic BIGINT NOT NULL DEFAULT 0,
                pulls_since_legendary BIGINT NOT NULL DEFAULT 0,
                updated_at BIGINT NOT NULL,
                PRIMARY KEY (player_id, pool_id)
            )
        "#
        .to_string()
    }
}

impl From<PityRow> for PityState {
    fn from(row: PityRow) -> Self {
        PityState {
            pulls_since_epic: u32::try_from(row.pulls_since_epic).unwrap_or(u32::MAX),
            pulls_since_legendary: u32::try_from(row.pulls_since_legendary).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InventoryRow {
    pub player_id: Uuid,
    pub item_id: String,
    pub copies: i64,
    pub first_obtained_at: i64,
    pub updated_at: i64,
}

impl SqlxSchema for InventoryRow {
    const TABLE_NAME: &'static str = "gacha_inventory";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        r#"
            CREATE TABLE IF NOT EXISTS gacha_inventory (
                player_id UUID NOT NULL,
                item_id TEXT NOT NULL,
                copies BIGINT NOT NULL DEFAULT 1,
                first_obtained_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL,
                PRIMARY KEY (player_id, item_id)
            )
        "#
        .to_string()
    }
}

impl From<InventoryRow> for OwnedItem {
    fn from(row: InventoryRow) -> Self {
        OwnedItem { item_id: row.item_id, copies: row.copies, first_obtained_at: row.first_obtained_at }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PullRow {
    pub id: Uuid,
    pub player_id: Uuid,
    pub pool_id: String,
    pub pull_size: String,
    pub currency: String,
    pub cost: i64,
    pub results: Json<Vec<PullResult>>,
    pub created_at: i64,
}

impl SqlxSchema for PullRow {
    const TABLE_NAME: &'static str = "gacha_pulls";
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS idx_gacha_pulls_player_created ON gacha_pulls (player_id, created_at DESC, seq DESC)",
    ];

    fn create_table_sql() -> String {
        r#"
            CREATE TABLE IF NOT EXISTS gacha_pulls (
                id UUID PRIMARY KEY,
                seq BIGSERIAL,
                player_id UUID NOT NULL,
                pool_id TEXT NOT NULL,
                pull_size TEXT NOT NULL,
                currency TEXT NOT NULL,
                cost BIGINT NOT NULL,
                results JSONB NOT NULL,
                created_at BIGINT NOT NULL
            )
        "#
        .to_string()
    }
}

impl TryFrom<PullRow> for PullRecord {
    type Error = anyhow::Error;

    fn try_from(row: PullRow) -> Result<Self, Self::Error> {
        Ok(PullRecord {
            id: row.id,
            player_id: row.player_id,
            pool_id: row.pool_id,
            pull_size: row.pull_size.parse()?,
            currency: row.currency.parse()?,
            cost: row.cost,
            results: row.results.0,
            created_at: row.created_at,
        })
    }
}

const PULL_COLUMNS: &str = "id, player_id, pool_id, pull_size, currency, cost, results, created_at";

fn db_err(context: &str, err: sqlx::Error) -> GachaError {
    if is_retryable_conflict(&err) {
        tracing::warn!("[PostgresStore::{}] conflict: {:?}", context, err);
        GachaError::ConcurrencyConflict
    } else {
        GachaError::Storage(anyhow!("[PostgresStore::{}] {}", context, err))
    }
}

/// Pulls run in one transaction each. The pity row of (player, pool) is
/// taken `FOR UPDATE` and serializes pulls of that key; the wallet debit is
/// a conditional update, so pulls on different pools cannot overdraw it.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GachaStore for PostgresStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn apply_pull(&self, player_id: Uuid, pool_id: &str, planner: PullPlanner) -> Result<PullReceipt, GachaError> {
        let now = get_current_timestamp();
        let mut tx = self.pool.begin().await.map_err(|e| db_err("apply_pull", e))?;

        // SET does not take bind parameters
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("apply_pull", e))?;

        sqlx::query(r#"
            INSERT INTO gacha_wallets (player_id, gems, tickets, updated_at)
            VALUES ($1, 0, 0, $2)
            ON CONFLICT (player_id) DO NOTHING
        "#)
        .bind(player_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_err("apply_pull", e))?;

        sqlx::query(r#"
            INSERT INTO gacha_pity (player_id, pool_id, pulls_since_epic, pulls_since_legendary, updated_at)
            VALUES ($1, $2, 0, 0, $3)
            ON CONFLICT (player_id, pool_id) DO NOTHING
        "#)
        .bind(player_id)
        .bind(pool_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_err("apply_pull", e))?;

        let pity_row: PityRow = sqlx::query_as(r#"
            SELECT player_id, pool_id, pulls_since_epic, pulls_since_legendary, updated_at
            FROM gacha_pity
            WHERE player_id = $1 AND pool_id = $2
            FOR UPDATE
        "#)
        .bind(player_id)
        .bind(pool_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_err("apply_pull", e))?;

        let wallet_row: WalletRow = sqlx::query_as(
            "SELECT player_id, gems, tickets, updated_at FROM gacha_wallets WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_err("apply_pull", e))?;

        let owned: Vec<(String,)> = sqlx::query_as("SELECT item_id FROM gacha_inventory WHERE player_id = $1")
            .bind(player_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_err("apply_pull", e))?;

        let snapshot = PlayerSnapshot {
            player_id,
            pool_id: pool_id.to_string(),
            wallet: wallet_row.into(),
            pity: pity_row.into(),
            owned: owned.into_iter().map(|(id,)| id).collect::<HashSet<_>>(),
        };

        let commit = match planner(&snapshot) {
            Ok(commit) => commit,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };
        let mut record = commit.record;

        let debit_sql = match record.currency {
            Currency::Gems => r#"
                UPDATE gacha_wallets SET gems = gems - $1, updated_at = $3
                WHERE player_id = $2 AND gems >= $1
                RETURNING gems, tickets
            "#,
            Currency::Tickets => r#"
                UPDATE gacha_wallets SET tickets = tickets - $1, updated_at = $3
                WHERE player_id = $2 AND tickets >= $1
                RETURNING gems, tickets
            "#,
        };
        let debited: Option<(i64, i64)> = sqlx::query_as(debit_sql)
            .bind(record.cost)
            .bind(player_id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_err("apply_pull", e))?;

        let wallet = match debited {
            Some((gems, tickets)) => Wallet::new(gems, tickets),
            None => {
                let _ = tx.rollback().await;
                let available = self.balance(player_id, record.currency).await.unwrap_or_default();
                return Err(GachaError::InsufficientFunds {
                    currency: record.currency,
                    required: record.cost,
                    available,
                });
            }
        };

        sqlx::query(r#"
            UPDATE gacha_pity SET pulls_since_epic = $1, pulls_since_legendary = $2, updated_at = $3
            WHERE player_id = $4 AND pool_id = $5
        "#)
        .bind(commit.pity.pulls_since_epic as i64)
        .bind(commit.pity.pulls_since_legendary as i64)
        .bind(now)
        .bind(player_id)
        .bind(pool_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_err("apply_pull", e))?;

        // The snapshot only covers this pool's lock; a pull on another pool
        // may have granted the same item since, so newness is settled here.
        for result in record.results.iter_mut() {
            let (copies,): (i64,) = sqlx::query_as(r#"
                INSERT INTO gacha_inventory (player_id, item_id, copies, first_obtained_at, updated_at)
                VALUES ($1, $2, 1, $3, $3)
                ON CONFLICT (player_id, item_id)
                DO UPDATE SET copies = gacha_inventory.copies + 1, updated_at = EXCLUDED.updated_at
                RETURNING copies
            "#)
            .bind(player_id)
            .bind(&result.item_id)
            .bind(record.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_err("apply_pull", e))?;
            result.is_new = copies == 1;
        }

        sqlx::query(r#"
            INSERT INTO gacha_pulls (id, player_id, pool_id, pull_size, currency, cost, results, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#)
        .bind(record.id)
        .bind(record.player_id)
        .bind(&record.pool_id)
        .bind(record.pull_size.as_str())
        .bind(record.currency.as_str())
        .bind(record.cost)
        .bind(Json(&record.results))
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_err("apply_pull", e))?;

        tx.commit().await.map_err(|e| db_err("apply_pull", e))?;

        Ok(PullReceipt { record, wallet, pity: commit.pity })
    }

    async fn wallet(&self, player_id: Uuid) -> Result<Wallet, GachaError> {
        let row: Option<WalletRow> = sqlx::query_as(
            "SELECT player_id, gems, tickets, updated_at FROM gacha_wallets WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("wallet", e))?;
        Ok(row.map(Wallet::from).unwrap_or_default())
    }

    async fn credit(&self, player_id: Uuid, currency: Currency, amount: i64) -> Result<Wallet, GachaError> {
        if amount < 0 {
            return Err(GachaError::InvalidRequest(format!("credit amount must not be negative, got {}", amount)));
        }
        let (gems, tickets) = match currency {
            Currency::Gems => (amount, 0),
            Currency::Tickets => (0, amount),
        };
        let (gems, tickets): (i64, i64) = sqlx::query_as(r#"
            INSERT INTO gacha_wallets (player_id, gems, tickets, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (player_id) DO UPDATE SET
                gems = gacha_wallets.gems + EXCLUDED.gems,
                tickets = gacha_wallets.tickets + EXCLUDED.tickets,
                updated_at = EXCLUDED.updated_at
            RETURNING gems, tickets
        "#)
        .bind(player_id)
        .bind(gems)
        .bind(tickets)
        .bind(get_current_timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("credit", e))?;
        Ok(Wallet::new(gems, tickets))
    }

    async fn pity(&self, player_id: Uuid, pool_id: &str) -> Result<PityState, GachaError> {
        let row: Option<PityRow> = sqlx::query_as(r#"
            SELECT player_id, pool_id, pulls_since_epic, pulls_since_legendary, updated_at
            FROM gacha_pity WHERE player_id = $1 AND pool_id = $2
        "#)
        .bind(player_id)
        .bind(pool_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("pity", e))?;
        Ok(row.map(PityState::from).unwrap_or_default())
    }

    async fn owns(&self, player_id: Uuid, item_id: &str) -> Result<bool, GachaError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM gacha_inventory WHERE player_id = $1 AND item_id = $2)",
        )
        .bind(player_id)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("owns", e))?;
        Ok(exists)
    }

    async fn collection(&self, player_id: Uuid) -> Result<Vec<OwnedItem>, GachaError> {
        let rows: Vec<InventoryRow> = sqlx::query_as(r#"
            SELECT player_id, item_id, copies, first_obtained_at, updated_at
            FROM gacha_inventory WHERE player_id = $1
            ORDER BY first_obtained_at, item_id
        "#)
        .bind(player_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("collection", e))?;
        Ok(rows.into_iter().map(OwnedItem::from).collect())
    }

    async fn history(&self, player_id: Uuid, pool_id: Option<&str>, limit: usize) -> Result<Vec<PullRecord>, GachaError> {
        let rows: Vec<PullRow> = sqlx::query_as(&format!(
            r#"
                SELECT {} FROM gacha_pulls
                WHERE player_id = $1 AND ($2::TEXT IS NULL OR pool_id = $2)
                ORDER BY created_at DESC, seq DESC
                LIMIT $3
            "#,
            PULL_COLUMNS
        ))
        .bind(player_id)
        .bind(pool_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("history", e))?;

        rows.into_iter()
            .map(|row| PullRecord::try_from(row).map_err(GachaError::Storage))
            .collect()
    }

    async fn total_pulls(&self, player_id: Uuid, pool_id: &str) -> Result<u64, GachaError> {
        let (total,): (i64,) = sqlx::query_as(r#"
            SELECT COALESCE(SUM(jsonb_array_length(results)), 0)::BIGINT
            FROM gacha_pulls WHERE player_id = $1 AND pool_id = $2
        "#)
        .bind(player_id)
        .bind(pool_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("total_pulls", e))?;
        Ok(total.max(0) as u64)
    }

    async fn find_pull(&self, pull_id: Uuid) -> Result<Option<PullRecord>, GachaError> {
        let row: Option<PullRow> = sqlx::query_as(&format!("SELECT {} FROM gacha_pulls WHERE id = $1", PULL_COLUMNS))
            .bind(pull_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_pull", e))?;
        row.map(|row| PullRecord::try_from(row).map_err(GachaError::Storage)).transpose()
    }
}
