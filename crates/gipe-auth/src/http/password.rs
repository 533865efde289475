//! Password endpoints: forgot, reset by link, authenticated change.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::AuthState;
use super::error::detail;
use super::extract::BearerAuth;
use crate::credentials::ResetRequestOutcome;
use crate::error::AuthError;

const NO_EMAIL_MESSAGE: &str = "Você não tem e-mail cadastrado e por isso a redefinição não é possível. Você deve procurar apoio na sua Diretoria Regional de Educação.";
const FORGOT_INTERNAL_ERROR_MESSAGE: &str = "Ocorreu um erro ao processar sua solicitação.";

/// Forgot-password request body.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Login to reset.
    pub username: String,
}

/// Reset-by-link request body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    /// Encoded principal id from the link.
    pub uid: String,
    /// Signed token from the link.
    pub token: String,
    /// New password.
    pub password: String,
    /// Confirmation.
    pub password2: String,
}

/// Authenticated change request body.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password.
    pub senha_atual: String,
    /// New password.
    pub nova_senha: String,
    /// Confirmation.
    pub confirmacao_nova_senha: String,
}

/// Handler for `POST /esqueci-senha`.
pub async fn forgot_password_handler(
    State(state): State<AuthState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "O campo username é obrigatório.");
    };

    match state.credentials.request_reset(&request.username).await {
        Ok(ResetRequestOutcome::Sent { email }) => (
            StatusCode::OK,
            Json(json!({ "detail": "Email enviado com sucesso", "email": email })),
        )
            .into_response(),
        Ok(ResetRequestOutcome::NoRegisteredEmail) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "email_nao_cadastrado", "message": NO_EMAIL_MESSAGE })),
        )
            .into_response(),
        Ok(ResetRequestOutcome::ProfileNotFound) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ AuthError::InvalidInput { .. }) => e.into_response(),
        Err(e) => {
            tracing::error!(
                login = %request.username.trim(),
                category = %e.category(),
                error = %e,
                "forgot password flow failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "erro_interno", "message": FORGOT_INTERNAL_ERROR_MESSAGE })),
            )
                .into_response()
        }
    }
}

/// Handler for `POST /redefinir-senha`.
pub async fn reset_password_handler(
    State(state): State<AuthState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "Dados inválidos.");
    };

    match state
        .credentials
        .reset_with_token(&request.uid, &request.token, &request.password, &request.password2)
        .await
    {
        Ok(()) => detail(StatusCode::OK, "Senha redefinida com sucesso."),
        Err(e) => e.into_response(),
    }
}

/// Handler for `POST /atualizar-senha`. Requires a bearer access token.
pub async fn change_password_handler(
    auth: BearerAuth,
    State(state): State<AuthState>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "Dados inválidos.");
    };

    match state
        .credentials
        .change_password(
            auth.principal_id,
            &request.senha_atual,
            &request.nova_senha,
            &request.confirmacao_nova_senha,
        )
        .await
    {
        Ok(()) => detail(StatusCode::OK, "Senha atualizada com sucesso."),
        Err(e) => e.into_response(),
    }
}
