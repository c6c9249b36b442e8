use anyhow::{anyhow, Result};
use uuid::Uuid;

use gacha_clients::bootstrap_schema;
use gacha_common::{env_or, env_parse_or};
use gacha_runtime::{Currency, GachaStore, PostgresStore};

/// Creates the gacha tables and, when `SEED_PLAYER_ID` is set, credits that
/// player with `SEED_GEMS` gems and `SEED_TICKETS` tickets.
///
/// `RESET_TABLES=true` drops the tables first.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    gacha_service_api::setup_tracing();

    let reset: bool = env_parse_or("RESET_TABLES", false)?;
    let pool = bootstrap_schema(reset).await?;
    tracing::info!("[init] schema ready");

    let seed_player = env_or("SEED_PLAYER_ID", "");
    if seed_player.is_empty() {
        return Ok(());
    }

    let player_id = Uuid::parse_str(&seed_player).map_err(|e| anyhow!("[init] SEED_PLAYER_ID is not a uuid: {}", e))?;
    let gems: i64 = env_parse_or("SEED_GEMS", 1000)?;
    let tickets: i64 = env_parse_or("SEED_TICKETS", 10)?;

    let store = PostgresStore::new(pool, std::time::Duration::from_millis(2000));
    store.credit(player_id, Currency::Gems, gems).await?;
    let wallet = store.credit(player_id, Currency::Tickets, tickets).await?;
    tracing::info!("[init] seeded player {} with {} gems, {} tickets", player_id, wallet.gems, wallet.tickets);
    Ok(())
}
