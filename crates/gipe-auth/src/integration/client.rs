//! HTTP client for the SME integration API.
//!
//! One `reqwest::Client` with a fixed per-call timeout serves every endpoint.
//! There are no retries and no caching: a slow or failing upstream fails the
//! request, and the user re-submits.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | credential check | `POST {base}/v1/autenticacao/externa` |
//! | role lookup | `GET {base}/Intranet/CarregarPerfisPorLogin/{rf}` |
//! | password change | `POST {base}/AutenticacaoSgp/AlterarSenha` |
//! | profile lookup | `GET {base}/AutenticacaoSgp/{login}/dados` |

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::payload::{DirectoryProfile, ExternalAuthPayload, RoleRegistryPayload};
use super::{CredentialChecker, PasswordDirectory, RoleRegistry};
use crate::config::IntegrationConfig;
use crate::error::AuthError;
use crate::AuthResult;

/// Header carrying the integration API key.
pub const API_KEY_HEADER: &str = "x-api-eol-key";

const PRINCIPAL_NOT_FOUND_MESSAGE: &str = "Usuário não encontrado no sistema EOL";
const DEFAULT_REJECTION_MESSAGE: &str = "Não foi possível alterar a senha.";

/// Transport-level failures, before they are mapped into [`AuthError`].
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// The request could not be sent or timed out.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The upstream answered with an unexpected status.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The response body could not be parsed.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl From<IntegrationError> for AuthError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::HttpError(status) => AuthError::upstream_status(status),
            other => AuthError::integration_unavailable(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct CredentialRequest<'a> {
    usuario: &'a str,
    senha: &'a str,
    #[serde(rename = "codigoSistema")]
    codigo_sistema: &'a str,
}

/// Client for the SME integration API.
#[derive(Debug, Clone)]
pub struct SmeIntegrationClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    system_code: String,
}

impl SmeIntegrationClient {
    /// Creates a client from the integration settings.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: &IntegrationConfig) -> AuthResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            system_code: config.system_code.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
        login: &str,
    ) -> Result<reqwest::Response, IntegrationError> {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(operation, login = %login, error = %e, "integration request failed");
                IntegrationError::NetworkError(e.to_string())
            })
    }

    async fn parse<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<T, IntegrationError> {
        response.json::<T>().await.map_err(|e| {
            tracing::warn!(operation, error = %e, "failed to parse integration response");
            IntegrationError::ParseError(e.to_string())
        })
    }
}

#[async_trait]
impl CredentialChecker for SmeIntegrationClient {
    async fn check_credentials(
        &self,
        login: &str,
        password: &str,
    ) -> AuthResult<ExternalAuthPayload> {
        let body = serde_json::to_vec(&CredentialRequest {
            usuario: login,
            senha: password,
            codigo_sistema: &self.system_code,
        })
        .map_err(|e| AuthError::internal(e.to_string()))?;

        tracing::info!(login = %login, "checking credentials with the identity system");

        let request = self
            .http_client
            .post(self.url("/v1/autenticacao/externa"))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json-patch+json")
            .body(body);
        let response = self.send(request, "check_credentials", login).await?;

        match response.status() {
            StatusCode::OK => Ok(Self::parse(response, "check_credentials").await?),
            StatusCode::UNAUTHORIZED => {
                tracing::info!(login = %login, "identity system rejected credentials");
                Err(AuthError::InvalidCredentials)
            }
            status => {
                tracing::warn!(login = %login, status = status.as_u16(), "credential check failed");
                Err(IntegrationError::HttpError(status.as_u16()).into())
            }
        }
    }
}

#[async_trait]
impl RoleRegistry for SmeIntegrationClient {
    async fn fetch_roles(&self, login: &str) -> AuthResult<RoleRegistryPayload> {
        tracing::info!(login = %login, "fetching roles from the registry");

        let request = self
            .http_client
            .get(self.url(&format!("/Intranet/CarregarPerfisPorLogin/{login}")))
            .header(CONTENT_TYPE, "application/json");
        let response = self.send(request, "fetch_roles", login).await?;

        match response.status() {
            StatusCode::OK => Ok(Self::parse(response, "fetch_roles").await?),
            StatusCode::UNAUTHORIZED => {
                tracing::info!(login = %login, "role registry does not know the login");
                Err(AuthError::principal_not_found(PRINCIPAL_NOT_FOUND_MESSAGE))
            }
            status => {
                tracing::warn!(login = %login, status = status.as_u16(), "role lookup failed");
                Err(IntegrationError::HttpError(status.as_u16()).into())
            }
        }
    }
}

#[async_trait]
impl PasswordDirectory for SmeIntegrationClient {
    async fn change_password(&self, login: &str, new_password: &str) -> AuthResult<()> {
        tracing::info!(login = %login, "changing password in the identity system");

        let request = self
            .http_client
            .post(self.url("/AutenticacaoSgp/AlterarSenha"))
            .form(&[("Usuario", login), ("Senha", new_password)]);
        let response = self.send(request, "change_password", login).await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                let message = rejection_message(&body);
                tracing::info!(
                    login = %login,
                    reason = %message,
                    "identity system rejected new password"
                );
                Err(AuthError::password_rejected(message))
            }
            status => {
                tracing::warn!(login = %login, status = status.as_u16(), "password change failed");
                Err(IntegrationError::HttpError(status.as_u16()).into())
            }
        }
    }

    async fn profile(&self, login: &str) -> AuthResult<DirectoryProfile> {
        tracing::info!(login = %login, "fetching profile from the identity system");

        let request = self
            .http_client
            .get(self.url(&format!("/AutenticacaoSgp/{login}/dados")))
            .header(CONTENT_TYPE, "application/json");
        let response = self.send(request, "profile", login).await?;

        if response.status() == StatusCode::OK {
            return Ok(Self::parse(response, "profile").await?);
        }

        tracing::info!(login = %login, status = response.status().as_u16(), "profile not found");
        Err(AuthError::principal_not_found("Dados não encontrados."))
    }
}

/// Extracts a user-facing message from a rejection body.
///
/// Accepts a JSON object with `mensagem`, `message` or `detail`, a bare JSON
/// string, or plain text.
fn rejection_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return DEFAULT_REJECTION_MESSAGE.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Object(map)) => ["mensagem", "message", "detail"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
        Ok(_) => DEFAULT_REJECTION_MESSAGE.to_string(),
        Err(_) => trimmed.to_string(),
    }
}
