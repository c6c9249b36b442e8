mod env;
mod global_state;
mod middleware;
mod response;
mod routes;
mod utils;

use std::time::Duration;

use axum::Router;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub use routes::{gacha_routes, misc_routes, player_routes, reveal_routes, PullBody};

pub use env::{ApiServerEnv, StoreKind};
pub use global_state::GlobalState;
pub use middleware::{authenticate, PlayerId};
pub use response::{gacha_status, AppError, AppSuccess, GenericResponse};
pub use utils::{extract_bearer_token, setup_tracing};

/// Every route group with the standard layers, ready to serve.
pub fn app(state: GlobalState) -> Router {
    Router::new()
        .merge(misc_routes())
        .merge(gacha_routes())
        .merge(player_routes())
        .merge(reveal_routes())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
