//! JWT access and refresh tokens.
//!
//! Tokens are signed with HS256 using the configured secret. Access tokens
//! carry the bound role as `perfil_codigo` / `perfil_nome` so downstream
//! authorization does not need a database round-trip. Refresh tokens carry
//! only the standard claims.
//!
//! ## Example
//!
//! ```ignore
//! use gipe_auth::token::JwtService;
//!
//! let jwt = JwtService::new(&config.token);
//! let pair = jwt.issue_pair(&principal)?;
//! let claims = jwt.verify_access(&pair.access)?;
//! assert_eq!(claims.perfil_codigo, Some(principal.role.codigo));
//! ```

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::error::AuthError;
use crate::types::{Principal, TokenPair};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Returns `true` if the token itself was rejected.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        !matches!(self, Self::EncodingError { .. })
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError { message } => AuthError::internal(message),
            JwtError::Expired => AuthError::invalid_token("Token expirado."),
            _ => AuthError::invalid_token("Token inválido."),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token sent with every request.
    Access,
    /// Longer-lived token exchanged for new access tokens.
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,
    /// Principal surrogate key.
    pub sub: String,
    /// Principal login.
    pub username: String,
    /// Token kind.
    pub token_type: TokenType,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
    /// Bound role code. Access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perfil_codigo: Option<i32>,
    /// Bound role name. Access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perfil_nome: Option<String>,
}

impl TokenClaims {
    /// Parses the subject as a principal id.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidClaims` when the subject is not a UUID.
    pub fn principal_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::invalid_claims("subject is not a UUID"))
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Issues and validates HS256 tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Creates a service from the token settings.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_token_lifetime: config.access_token_lifetime,
            refresh_token_lifetime: config.refresh_token_lifetime,
        }
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issues an access/refresh pair for a principal.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue_access(principal)?,
            refresh: self.issue(principal, TokenType::Refresh)?,
        })
    }

    /// Issues an access token carrying the principal's current role.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn issue_access(&self, principal: &Principal) -> Result<String, JwtError> {
        self.issue(principal, TokenType::Access)
    }

    fn issue(&self, principal: &Principal, token_type: TokenType) -> Result<String, JwtError> {
        let lifetime = match token_type {
            TokenType::Access => self.access_token_lifetime,
            TokenType::Refresh => self.refresh_token_lifetime,
        };
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let (perfil_codigo, perfil_nome) = match token_type {
            TokenType::Access => (Some(principal.role.codigo), Some(principal.role.nome.clone())),
            TokenType::Refresh => (None, None),
        };

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            token_type,
            iat: now,
            exp: now + i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX / 2),
            jti: Uuid::new_v4().to_string(),
            perfil_codigo,
            perfil_nome,
        };

        self.encode(&claims)
    }

    /// Signs arbitrary claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Validates a token of either kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature, issuer or expiration is invalid.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Ok(decode::<TokenClaims>(token, &self.decoding_key, &validation)?.claims)
    }

    /// Validates an access token.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify), plus `InvalidClaims` for a refresh token.
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.verify_kind(token, TokenType::Access)
    }

    /// Validates a refresh token.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify), plus `InvalidClaims` for an access token.
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.verify_kind(token, TokenType::Refresh)
    }

    fn verify_kind(&self, token: &str, expected: TokenType) -> Result<TokenClaims, JwtError> {
        let claims = self.verify(token)?;
        if claims.token_type != expected {
            return Err(JwtError::invalid_claims(format!(
                "expected {expected} token, got {}",
                claims.token_type
            )));
        }
        Ok(claims)
    }
}
