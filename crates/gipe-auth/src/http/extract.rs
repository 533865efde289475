//! Bearer token extractor.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use super::AuthState;
use crate::error::AuthError;
use crate::token::TokenClaims;

/// Message for requests without a bearer token.
pub const MISSING_CREDENTIALS_MESSAGE: &str =
    "As credenciais de autenticação não foram fornecidas.";

/// A validated access token from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    /// Decoded claims.
    pub claims: TokenClaims,
    /// Principal the token was issued to.
    pub principal_id: Uuid,
}

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AuthState::from_ref(state);

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AuthError::invalid_token(MISSING_CREDENTIALS_MESSAGE))?;

        let claims = state.jwt.verify_access(token).map_err(|e| {
            tracing::debug!(error = %e, path = %parts.uri.path(), "bearer token rejected");
            AuthError::from(e)
        })?;
        let principal_id = claims.principal_id()?;

        Ok(Self {
            claims,
            principal_id,
        })
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
