use gacha_database::init_databases;
use gacha_common::define_module_client;
use sqlx::PgPool;

init_databases!(
    default: [
        gacha_runtime::WalletRow,
        gacha_runtime::PityRow,
        gacha_runtime::InventoryRow,
        gacha_runtime::PullRow,
    ]
);

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: PgPool,
    env: ["DATABASE_URL"],
    setup: async {
        connect(false, false).await.map(|pool| pool.clone())
    }
}

/// Connects and brings the gacha tables up, optionally dropping them first.
/// Must run before any `PostgresClient::setup_connection` in the same
/// process, since the pool is created once.
pub async fn bootstrap_schema(drop_tables: bool) -> anyhow::Result<PgPool> {
    tracing::info!("[bootstrap_schema] drop_tables = {}", drop_tables);
    let pool = connect(drop_tables, true).await?;
    Ok(pool.clone())
}
