//! Authentication and identity reconciliation error types.
//!
//! Every failure that can leave the login and credential flows is expressed
//! as an [`AuthError`]. Lower layers (external HTTP client, token service,
//! database) keep their own error enums and are translated at the service
//! boundary, so the transport layer only ever sees this type.

use std::fmt;

/// Generic message returned to users for every 5xx outcome.
pub const INTERNAL_ERROR_MESSAGE: &str = "Erro interno do sistema. Tente novamente mais tarde.";

/// Message returned for bad login/password pairs.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Usuário e/ou senha inválida";

/// Errors that can occur during authentication and credential operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The submitted request or identifier is malformed.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// User-facing description of what is wrong.
        message: String,
    },

    /// The login/password pair was rejected.
    ///
    /// Never says which of the two was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The principal authenticated but holds no role allowed to use the system.
    #[error("Not authorized: {first_name}")]
    NotAuthorized {
        /// First name used in the greeting of the user-facing message.
        first_name: String,
    },

    /// The external role registry does not know the principal.
    #[error("Principal not found: {message}")]
    PrincipalNotFound {
        /// Description of the lookup that failed.
        message: String,
    },

    /// An external dependency is down, slow or answered with an unexpected status.
    #[error("Integration unavailable: {message}")]
    IntegrationUnavailable {
        /// Upstream HTTP status, when one was received.
        status: Option<u16>,
        /// Operator-facing description.
        message: String,
    },

    /// The external identity system refused a new password.
    #[error("Password rejected: {message}")]
    PasswordRejected {
        /// Message reported by the external system, shown to the user.
        message: String,
    },

    /// A local write violated a database integrity constraint.
    #[error("Persistence conflict: {message}")]
    PersistenceConflict {
        /// Operator-facing description.
        message: String,
    },

    /// A local read or write failed for any other reason.
    #[error("Persistence failure: {message}")]
    PersistenceFailure {
        /// Operator-facing description.
        message: String,
    },

    /// The bearer or refresh token is missing, malformed or expired.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// User-facing description.
        message: String,
    },

    /// The service is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a new `NotAuthorized` error greeting the given first name.
    #[must_use]
    pub fn not_authorized(first_name: impl Into<String>) -> Self {
        Self::NotAuthorized {
            first_name: first_name.into(),
        }
    }

    /// Creates a new `PrincipalNotFound` error.
    #[must_use]
    pub fn principal_not_found(message: impl Into<String>) -> Self {
        Self::PrincipalNotFound {
            message: message.into(),
        }
    }

    /// Creates a new `IntegrationUnavailable` error without an upstream status.
    #[must_use]
    pub fn integration_unavailable(message: impl Into<String>) -> Self {
        Self::IntegrationUnavailable {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a new `IntegrationUnavailable` error for an upstream status.
    #[must_use]
    pub fn upstream_status(status: u16) -> Self {
        Self::IntegrationUnavailable {
            status: Some(status),
            message: format!("upstream answered with status {status}"),
        }
    }

    /// Creates a new `PasswordRejected` error.
    #[must_use]
    pub fn password_rejected(message: impl Into<String>) -> Self {
        Self::PasswordRejected {
            message: message.into(),
        }
    }

    /// Creates a new `PersistenceConflict` error.
    #[must_use]
    pub fn persistence_conflict(message: impl Into<String>) -> Self {
        Self::PersistenceConflict {
            message: message.into(),
        }
    }

    /// Creates a new `PersistenceFailure` error.
    #[must_use]
    pub fn persistence_failure(message: impl Into<String>) -> Self {
        Self::PersistenceFailure {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::InvalidCredentials
                | Self::NotAuthorized { .. }
                | Self::PrincipalNotFound { .. }
                | Self::PasswordRejected { .. }
                | Self::InvalidToken { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::IntegrationUnavailable { .. }
                | Self::PersistenceConflict { .. }
                | Self::PersistenceFailure { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if a local write failed after external authentication.
    #[must_use]
    pub fn is_persistence_error(&self) -> bool {
        matches!(
            self,
            Self::PersistenceConflict { .. } | Self::PersistenceFailure { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::Validation,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::NotAuthorized { .. } => ErrorCategory::Authorization,
            Self::PrincipalNotFound { .. } => ErrorCategory::Authorization,
            Self::IntegrationUnavailable { .. } => ErrorCategory::Integration,
            Self::PasswordRejected { .. } => ErrorCategory::Validation,
            Self::PersistenceConflict { .. } => ErrorCategory::Persistence,
            Self::PersistenceFailure { .. } => ErrorCategory::Persistence,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the message shown to the end user.
    ///
    /// Server-side errors collapse into one generic message. Upstream status
    /// codes and persistence details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { message } => message.clone(),
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
            Self::NotAuthorized { first_name } => format!(
                "Olá {first_name}! Desculpe, mas o acesso ao GIPE é restrito a perfis específicos."
            ),
            Self::PrincipalNotFound { .. } => INVALID_CREDENTIALS_MESSAGE.to_string(),
            Self::PasswordRejected { message } => message.clone(),
            Self::InvalidToken { message } => message.clone(),
            Self::IntegrationUnavailable { .. }
            | Self::PersistenceConflict { .. }
            | Self::PersistenceFailure { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification failed.
    Authentication,
    /// The identity is known but lacks an allowed role.
    Authorization,
    /// Token validation errors.
    Token,
    /// Request validation errors.
    Validation,
    /// External identity system errors.
    Integration,
    /// Local database errors.
    Persistence,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Integration => write!(f, "integration"),
            Self::Persistence => write!(f, "persistence"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
