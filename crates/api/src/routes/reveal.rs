use std::time::Duration;

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use uuid::Uuid;

use crate::{response::AppError, GlobalState};

pub fn reveal_routes() -> Router<GlobalState> {
    Router::new()
        .route("/gacha/reveal/{pull_id}",
            get(reveal)
        )
}

/// Replays a committed pull as server-sent events: one `reveal` event per
/// result in draw order, then `done`. Disconnecting only stops the stream.
async fn reveal(
    State(state): State<GlobalState>,
    Path(pull_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let sequence = state
        .engine
        .reveal(pull_id, state.reveal_interval)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("[/gacha/reveal] pull {} not found", pull_id)))?;

    let total = sequence.len();
    let steps = sequence
        .paced()
        .map(|step| Event::default().event("reveal").json_data(step));
    let done = stream::once(async move {
        Event::default().event("done").json_data(json!({ "pull_id": pull_id, "total": total }))
    });

    Ok(Sse::new(steps.chain(done)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
