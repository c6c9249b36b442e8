use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    response::{AppError, AppSuccess},
    GlobalState,
};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

pub fn player_routes() -> Router<GlobalState> {
    Router::new()
        .route("/gacha/history/{player_id}",
            get(history)
        )
        .route("/gacha/collection/{player_id}",
            get(collection)
        )
        .route("/gacha/wallet/{player_id}",
            get(wallet)
        )
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub pool_id: Option<String>,
}

async fn history(
    State(state): State<GlobalState>,
    Path(player_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<AppSuccess, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
    let history = state.engine.history(player_id, query.pool_id.as_deref(), limit).await?;
    Ok(AppSuccess::new(StatusCode::OK, "History fetched successfully", json!(history)))
}

async fn collection(
    State(state): State<GlobalState>,
    Path(player_id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let collection = state.engine.collection(player_id).await?;
    Ok(AppSuccess::new(StatusCode::OK, "Collection fetched successfully", json!(collection)))
}

async fn wallet(
    State(state): State<GlobalState>,
    Path(player_id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let wallet = state.engine.wallet(player_id).await?;
    Ok(AppSuccess::new(StatusCode::OK, "Wallet fetched successfully", json!(wallet)))
}
