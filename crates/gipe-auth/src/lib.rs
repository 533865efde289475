//! # gipe-auth
//!
//! Authentication and identity reconciliation for the GIPE backend.
//!
//! This crate provides:
//! - Login by registration number (RF) against the external identity system
//! - Login by CPF against locally provisioned principals
//! - Role selection over the external role registry
//! - Reconciliation of external identities into the local store
//! - JWT access/refresh tokens
//! - Password reset links and password changes
//!
//! ## Overview
//!
//! The external identity system is authoritative for credentials and roles.
//! The local store mirrors what it returns so the rest of the backend can
//! work with a stable principal id. Nothing is written locally until the
//! external system accepted the credentials.
//!
//! ## Modules
//!
//! - [`config`] - Integration, token and reset settings
//! - [`identifier`] - Login normalization
//! - [`integration`] - External identity system client
//! - [`policy`] - Role selection rules
//! - [`orchestrator`] - Login flow
//! - [`credentials`] - Password reset and change
//! - [`storage`] - Identity store trait
//! - [`token`] - JWT issuing and validation
//! - [`reset`] - Reset link signing
//! - [`password`] - Password hashing
//! - [`http`] - Axum handlers

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod identifier;
pub mod integration;
pub mod orchestrator;
pub mod password;
pub mod policy;
pub mod reset;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError};
pub use credentials::{
    CredentialLifecycleService, LoggingResetNotifier, ResetNotifier, ResetRequestOutcome,
};
pub use error::{AuthError, ErrorCategory};
pub use http::{AuthState, BearerAuth, router};
pub use identifier::{LoginIdentifier, anonymize_email, is_cpf};
pub use integration::{
    CredentialChecker, PasswordDirectory, RoleRegistry, SmeIntegrationClient,
};
pub use orchestrator::AuthenticationOrchestrator;
pub use policy::{AuthorizedRoleCode, RoleAuthorizationPolicy, RoleSelection, RoleSource};
pub use reset::ResetLinkSigner;
pub use storage::{IdentityStore, InMemoryIdentityStore};
pub use token::{JwtError, JwtService, TokenClaims, TokenType};
pub use types::{
    AuthenticationOutcome, Network, Principal, ReconciledIdentity, Role, TokenPair, Unit,
    UnitSummary, UnitType, UnitValidationError,
};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use gipe_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{AuthState, BearerAuth, router};
    pub use crate::storage::IdentityStore;
    pub use crate::types::{Network, Principal, ReconciledIdentity, Role, Unit, UnitSummary};
}
