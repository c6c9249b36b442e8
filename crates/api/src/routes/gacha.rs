use std::collections::BTreeMap;

use anyhow::anyhow;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use gacha_runtime::{Banner, Currency, PullOutcome, PullRequest, PullSize, Rarity};

use crate::{
    middleware::{authenticate, PlayerId},
    response::{AppError, AppSuccess},
    GlobalState,
};

pub fn gacha_routes() -> Router<GlobalState> {
    Router::new()
        .route("/gacha/pools",
            get(list_pools)
        )
        .route("/gacha/rates",
            get(default_rates)
        )
        .route("/gacha/rates/{pool_id}",
            get(pool_rates)
        )

        .route("/gacha/pull",
            post(pull)
            .route_layer(middleware::from_fn(authenticate))
        )
        .route("/gacha/pull/{player_id}",
            post(pull_for_player)
            .route_layer(middleware::from_fn(authenticate))
        )
}

#[derive(Debug, Serialize)]
struct PoolInfo {
    id: String,
    name: String,
    description: String,
    item_count: usize,
    is_default: bool,
}

async fn list_pools(State(state): State<GlobalState>) -> Result<AppSuccess, AppError> {
    let banners = state.engine.banners();
    let pools: Vec<PoolInfo> = banners
        .pools()
        .map(|banner| PoolInfo {
            id: banner.id.clone(),
            name: banner.name.clone(),
            description: banner.description.clone(),
            item_count: banner.items().len(),
            is_default: banner.id == banners.default_pool(),
        })
        .collect();

    Ok(AppSuccess::new(StatusCode::OK, "Pools fetched successfully", json!(pools)))
}

fn rates_body(banner: &Banner) -> Value {
    let rates: BTreeMap<Rarity, f64> = Rarity::ALL
        .into_iter()
        .map(|rarity| (rarity, banner.rates.probability_percent(rarity)))
        .collect();

    json!({
        "pool_id": banner.id,
        "rates": rates,
        "weights": banner.rates.weights,
        "pity_system": {
            "legendary_pity": banner.rates.legendary_pity_threshold,
            "epic_pity": banner.rates.epic_pity_threshold,
        },
        "costs": banner.rates.costs,
    })
}

async fn default_rates(State(state): State<GlobalState>) -> Result<Json<Value>, AppError> {
    let banner = state.engine.banner(None)?;
    Ok(Json(rates_body(&banner)))
}

async fn pool_rates(
    State(state): State<GlobalState>,
    Path(pool_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let banner = state.engine.banner(Some(&pool_id))?;
    Ok(Json(rates_body(&banner)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PullBody {
    pub pull_type: PullSize,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub pool_id: Option<String>,
}

fn pull_body(outcome: &PullOutcome) -> Value {
    let record = &outcome.record;
    let mut body = json!({
        "pull_id": record.id,
        "pool_id": record.pool_id,
        "type": record.pull_size,
        "cost": record.cost,
        "currency": record.currency,
        "summary": outcome.summary,
        "remaining_currency": outcome.remaining_currency,
    });

    match record.pull_size {
        PullSize::Single => body["result"] = json!(record.results.first()),
        PullSize::Ten => body["results"] = json!(record.results),
    }
    body
}

async fn run_pull(state: &GlobalState, player_id: Uuid, body: PullBody) -> Result<Json<Value>, AppError> {
    if body.pool_id.as_deref().is_some_and(|pool| pool.trim().is_empty()) {
        return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!("[/gacha/pull] pool_id must not be blank")));
    }

    let outcome = state
        .engine
        .pull(PullRequest {
            player_id,
            pool_id: body.pool_id,
            pull_size: body.pull_type,
            currency: body.currency,
        })
        .await?;

    Ok(Json(pull_body(&outcome)))
}

async fn pull(
    State(state): State<GlobalState>,
    Extension(PlayerId(player_id)): Extension<PlayerId>,
    Json(body): Json<PullBody>,
) -> Result<Json<Value>, AppError> {
    run_pull(&state, player_id, body).await
}

async fn pull_for_player(
    State(state): State<GlobalState>,
    Extension(PlayerId(caller)): Extension<PlayerId>,
    Path(player_id): Path<Uuid>,
    Json(body): Json<PullBody>,
) -> Result<Json<Value>, AppError> {
    if caller != player_id {
        return Err(AppError::new(
            StatusCode::FORBIDDEN,
            anyhow!("[pull_for_player] token for {} cannot pull for {}", caller, player_id),
        ));
    }
    run_pull(&state, player_id, body).await
}
