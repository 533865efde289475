//! HTTP mapping for [`AuthError`].
//!
//! Every error body is `{"detail": <message>}`. Server-side failures share one
//! generic message; the variant and upstream details are only logged.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } | Self::PasswordRejected { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::NotAuthorized { .. }
            | Self::PrincipalNotFound { .. }
            | Self::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            Self::IntegrationUnavailable { .. }
            | Self::PersistenceConflict { .. }
            | Self::PersistenceFailure { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(status = status.as_u16(), category = %self.category(), "error response");
        (status, Json(json!({ "detail": self.user_message() }))).into_response()
    }
}

/// Builds a `{"detail": ...}` response.
pub fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{INTERNAL_ERROR_MESSAGE, INVALID_CREDENTIALS_MESSAGE};

    async fn body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::invalid_input("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::not_authorized("Ana").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::password_rejected("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::persistence_conflict("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_invalid_credentials_body() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body(response).await,
            json!({ "detail": INVALID_CREDENTIALS_MESSAGE })
        );
    }

    #[tokio::test]
    async fn test_upstream_status_is_not_leaked() {
        let response = AuthError::upstream_status(503).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await,
            json!({ "detail": INTERNAL_ERROR_MESSAGE })
        );
    }
}
