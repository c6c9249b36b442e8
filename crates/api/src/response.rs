use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gacha_runtime::GachaError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type AppSuccess = GenericResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl GenericResponse {
    pub fn new(status: StatusCode, message: &str, data: serde_json::Value) -> Self {
        Self {
            status: status.as_u16(),
            message: message.to_string(),
            data,
        }
    }
}

impl IntoResponse for GenericResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json::from(self)).into_response()
    }
}

/// HTTP status a domain error is reported with.
pub fn gacha_status(err: &GachaError) -> StatusCode {
    match err {
        GachaError::InsufficientFunds { .. } | GachaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GachaError::UnknownPool(_) => StatusCode::NOT_FOUND,
        GachaError::ConcurrencyConflict => StatusCode::CONFLICT,
        GachaError::EmptyPool { .. } | GachaError::Config(_) | GachaError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);
impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.0.is_server_error() {
            tracing::error!("CODE: {}, MESSAGE: {:#}", self.0.as_u16(), self.1);
        } else {
            tracing::warn!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
        }
        GenericResponse::new(self.0, &self.1.to_string(), json!({})).into_response()
    }
}

// `?` on anything convertible to `anyhow::Error`. Domain errors keep their
// own status, everything else is a bad request.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        let status = err
            .downcast_ref::<GachaError>()
            .map(gacha_status)
            .unwrap_or(StatusCode::BAD_REQUEST);
        Self(status, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gacha_runtime::Currency;

    #[test]
    fn test_domain_errors_keep_their_status() {
        let err: AppError = GachaError::InsufficientFunds { currency: Currency::Gems, required: 900, available: 10 }.into();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err: AppError = GachaError::ConcurrencyConflict.into();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let err: AppError = GachaError::UnknownPool("limited".to_string()).into();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let err: AppError = anyhow::anyhow!("anything else").into();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
