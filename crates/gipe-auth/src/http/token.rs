//! `POST /verify-token` and `POST /token/refresh`.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::AuthState;
use super::error::detail;
use super::extract::bearer_token;
use crate::error::AuthError;

/// Message for a verify request without any token.
pub const MISSING_TOKEN_MESSAGE: &str =
    "Token ausente. Envie no body (token) ou no header Authorization: Bearer <token>.";

#[derive(Debug, Default, Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    token: Option<String>,
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh: String,
}

/// Handler for `POST /verify-token`.
///
/// The token is read from the body `{"token": ...}` first, then from the
/// `Authorization: Bearer` header. Either token kind is accepted.
pub async fn verify_token_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let from_body = serde_json::from_slice::<VerifyRequest>(&body)
        .unwrap_or_default()
        .token
        .filter(|t| !t.trim().is_empty());

    let token = match from_body.as_deref().or_else(|| bearer_token(&headers)) {
        Some(token) => token.trim().to_string(),
        None => return detail(StatusCode::BAD_REQUEST, MISSING_TOKEN_MESSAGE),
    };

    match state.jwt.verify(&token) {
        Ok(claims) => {
            tracing::debug!(sub = %claims.sub, token_type = %claims.token_type, "token verified");
            (
                StatusCode::OK,
                Json(json!({ "detail": "Token válido.", "status": 200 })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "token verification failed");
            AuthError::from(e).into_response()
        }
    }
}

/// Handler for `POST /token/refresh`.
///
/// Re-reads the principal so the new access token carries its current role.
pub async fn refresh_handler(
    State(state): State<AuthState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "O campo refresh é obrigatório.");
    };

    match refresh(&state, &request.refresh).await {
        Ok(access) => (StatusCode::OK, Json(json!({ "access": access }))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn refresh(state: &AuthState, refresh_token: &str) -> Result<String, AuthError> {
    let claims = state.jwt.verify_refresh(refresh_token)?;
    let id = claims.principal_id()?;

    let principal = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AuthError::invalid_token("Usuário não encontrado."))?;

    tracing::info!(login = %principal.username, "access token refreshed");
    Ok(state.jwt.issue_access(&principal)?)
}
