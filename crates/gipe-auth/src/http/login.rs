//! `POST /login`.
//!
//! # Request
//!
//! ```text
//! POST /login
//! Content-Type: application/json
//!
//! {"username": "1234567", "password": "..."}
//! ```
//!
//! `login` and `senha` are accepted as aliases.
//!
//! # Response
//!
//! ```json
//! {
//!   "name": "Maria Silva",
//!   "email": "maria@sme.sp.gov.br",
//!   "cpf": "12345678901",
//!   "login": "1234567",
//!   "perfil_acesso": {"codigo": 3360, "nome": "DIRETOR DE ESCOLA"},
//!   "unidade_lotacao": [{"codigo": "000191", "nomeUnidade": "EMEF ..."}],
//!   "token": "<access>",
//!   "refresh": "<refresh>"
//! }
//! ```

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::AuthState;
use super::error::detail;
use crate::types::{AuthenticationOutcome, Role, UnitSummary};

/// Message for a missing or malformed login body.
pub const INVALID_BODY_MESSAGE: &str = "Credenciais inválidas";

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// RF or CPF, punctuation allowed.
    #[serde(alias = "login")]
    pub username: String,
    /// Plaintext password.
    #[serde(alias = "senha")]
    pub password: String,
}

/// Role as shown to the frontend.
#[derive(Debug, Serialize)]
pub struct AccessProfile {
    /// Role code.
    pub codigo: i32,
    /// Role name.
    pub nome: String,
}

impl From<Role> for AccessProfile {
    fn from(role: Role) -> Self {
        Self {
            codigo: role.codigo,
            nome: role.nome,
        }
    }
}

/// Successful login body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Display name.
    pub name: String,
    /// E-mail, empty when unknown.
    pub email: String,
    /// Taxpayer document.
    pub cpf: String,
    /// Normalized login.
    pub login: String,
    /// Bound role.
    pub perfil_acesso: AccessProfile,
    /// Assigned units.
    pub unidade_lotacao: Vec<UnitSummary>,
    /// Access token.
    pub token: String,
    /// Refresh token.
    pub refresh: String,
}

impl From<AuthenticationOutcome> for LoginResponse {
    fn from(outcome: AuthenticationOutcome) -> Self {
        Self {
            name: outcome.name,
            email: outcome.email,
            cpf: outcome.cpf,
            login: outcome.login,
            perfil_acesso: outcome.role.into(),
            unidade_lotacao: outcome.units,
            token: outcome.tokens.access,
            refresh: outcome.tokens.refresh,
        }
    }
}

/// Handler for `POST /login`.
pub async fn login_handler(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) if !request.username.trim().is_empty() && !request.password.is_empty() => {
            request
        }
        Ok(_) => return detail(StatusCode::BAD_REQUEST, INVALID_BODY_MESSAGE),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "malformed login body");
            return detail(StatusCode::BAD_REQUEST, INVALID_BODY_MESSAGE);
        }
    };

    match state
        .orchestrator
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(LoginResponse::from(outcome))).into_response(),
        Err(e) => e.into_response(),
    }
}
