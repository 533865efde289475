//! Authentication configuration.
//!
//! One explicit configuration value is built at process start and handed to
//! every client and service that needs it. Nothing reads the environment
//! after startup.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth.integration]
//! base_url = "https://smeintegracaoapi.sme.prefeitura.sp.gov.br/api"
//! api_key = "..."
//! system_code = "1234"
//! request_timeout = "10s"
//!
//! [auth.token]
//! secret = "..."
//! access_token_lifetime = "1h"
//!
//! [auth.password_reset]
//! secret = "..."
//! frontend_url = "https://gipe.sme.prefeitura.sp.gov.br"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// External identity system (CoreSSO / EOL) settings.
    pub integration: IntegrationConfig,

    /// Access/refresh token settings.
    pub token: TokenConfig,

    /// Password reset link settings.
    pub password_reset: PasswordResetConfig,
}

/// Settings for the external identity and role registry endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Base URL shared by the credential, role and profile endpoints.
    pub base_url: String,

    /// Value sent in the `x-api-eol-key` header.
    pub api_key: String,

    /// System code sent as `codigoSistema` when checking credentials.
    pub system_code: String,

    /// Per-call timeout. Calls are never retried.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            api_key: String::new(),
            system_code: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Token issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HS256 signing secret.
    pub secret: String,

    /// Value of the `iss` claim.
    pub issuer: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "gipe".to_string(),
            access_token_lifetime: Duration::from_secs(3600), // 1 hour
            refresh_token_lifetime: Duration::from_secs(24 * 3600), // 1 day
        }
    }
}

/// Password reset link configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordResetConfig {
    /// HMAC key for reset tokens.
    pub secret: String,

    /// How long a reset link stays valid.
    #[serde(with = "humantime_serde")]
    pub link_lifetime: Duration,

    /// Frontend base URL; links point to `{frontend_url}/reset-senha/{uid}/{token}`.
    pub frontend_url: String,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            link_lifetime: Duration::from_secs(3 * 24 * 3600), // 3 days
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The integration base URL is not an absolute http(s) URL
    /// - The token or reset secret is empty
    /// - Any timeout or lifetime is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = Url::parse(&self.integration.base_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "integration.base_url '{}' is not a valid URL: {e}",
                self.integration.base_url
            ))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(format!(
                "integration.base_url must use http or https, got '{}'",
                base.scheme()
            )));
        }
        if self.integration.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "integration.request_timeout must be > 0".to_string(),
            ));
        }

        if self.token.secret.is_empty() {
            return Err(ConfigError::Missing("token.secret".to_string()));
        }
        if self.token.access_token_lifetime.is_zero() || self.token.refresh_token_lifetime.is_zero()
        {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be > 0".to_string(),
            ));
        }

        if self.password_reset.secret.is_empty() {
            return Err(ConfigError::Missing("password_reset.secret".to_string()));
        }
        if self.password_reset.link_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "password_reset.link_lifetime must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the integration base URL without a trailing slash.
    #[must_use]
    pub fn integration_base(&self) -> &str {
        self.integration.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AuthConfig {
        let mut cfg = AuthConfig::default();
        cfg.token.secret = "token-secret".to_string();
        cfg.password_reset.secret = "reset-secret".to_string();
        cfg
    }

    #[test]
    fn test_defaults() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.integration.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.token.access_token_lifetime, Duration::from_secs(3600));
        assert_eq!(
            cfg.password_reset.link_lifetime,
            Duration::from_secs(3 * 24 * 3600)
        );
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_secrets() {
        let mut cfg = valid();
        cfg.token.secret.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(_))));

        let mut cfg = valid();
        cfg.password_reset.secret.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut cfg = valid();
        cfg.integration.base_url = "not a url".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue(_))));

        cfg.integration.base_url = "ftp://example.com".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut cfg = valid();
        cfg.integration.request_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_integration_base_trims_trailing_slash() {
        let mut cfg = valid();
        cfg.integration.base_url = "https://api.example.com/api/".to_string();
        assert_eq!(cfg.integration_base(), "https://api.example.com/api");
    }

    #[test]
    fn test_deserialize_humantime() {
        let json = serde_json::json!({
            "integration": { "base_url": "https://x.example", "request_timeout": "5s" },
            "token": { "secret": "s", "access_token_lifetime": "15m" }
        });
        let cfg: AuthConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.integration.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.token.access_token_lifetime, Duration::from_secs(900));
        assert_eq!(cfg.token.issuer, "gipe");
    }
}
