use anyhow::anyhow;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::response::AppError;
use crate::utils::extract_bearer_token;

/// The player a request acts for, set by `authenticate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerId(pub Uuid);

/// Reads `Authorization: Bearer <player uuid>`. Tokens are issued by the
/// session service in front of this one.
pub async fn authenticate(mut req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let token = extract_bearer_token(&req)?;
    let player_id = Uuid::parse_str(&token)
        .map_err(|_| AppError::new(StatusCode::UNAUTHORIZED, anyhow!("[authenticate] bearer token is not a player id")))?;

    req.extensions_mut().insert(PlayerId(player_id));
    Ok(next.run(req).await)
}
