use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use agora_common::TokenError;
use agora_community::BadgeError;

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

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);
impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
        GenericResponse::new(self.0, &self.1.to_string(), json!({})).into_response()
    }
}

fn status_of(err: &anyhow::Error) -> StatusCode {
    if let Some(badge_error) = err.downcast_ref::<BadgeError>() {
        return match badge_error {
            BadgeError::NotFound { .. } => StatusCode::NOT_FOUND,
            BadgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BadgeError::Authorization(_) => StatusCode::FORBIDDEN,
            BadgeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
    }
    if err.downcast_ref::<TokenError>().is_some() {
        return StatusCode::UNAUTHORIZED;
    }
    StatusCode::BAD_REQUEST
}

// Enables `?` on anything convertible to `anyhow::Error`; badge and token
// errors keep their own status code.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self(status_of(&err), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_errors_map_to_status_codes() {
        let cases = [
            (BadgeError::not_found("user", "x"), StatusCode::NOT_FOUND),
            (BadgeError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (BadgeError::Authorization("no".into()), StatusCode::FORBIDDEN),
            (BadgeError::from(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).0, expected);
        }
        assert_eq!(AppError::from(TokenError::Expired).0, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(anyhow::anyhow!("other")).0, StatusCode::BAD_REQUEST);
    }
}
