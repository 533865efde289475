//! External identity system integration.
//!
//! The login and credential flows talk to three external collaborators, all
//! served by the same integration API:
//!
//! - [`CredentialChecker`] verifies a login/password pair (CoreSSO)
//! - [`RoleRegistry`] lists the positions held by a registration number (EOL)
//! - [`PasswordDirectory`] changes passwords and looks up profile data
//!
//! [`SmeIntegrationClient`] implements all three over HTTP. Services depend on
//! the traits only, so tests substitute in-memory fakes.

pub mod client;
pub mod payload;

use async_trait::async_trait;

use crate::AuthResult;

pub use client::SmeIntegrationClient;
pub use payload::{DirectoryProfile, ExternalAuthPayload, RoleEntry, RoleRegistryPayload};

/// Verifies credentials against the external identity system.
#[async_trait]
pub trait CredentialChecker: Send + Sync {
    /// Checks a login/password pair.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` when the identity system answers 401
    /// - `AuthError::IntegrationUnavailable` for any other status or transport failure
    async fn check_credentials(&self, login: &str, password: &str)
    -> AuthResult<ExternalAuthPayload>;
}

/// Looks up the positions held by a registration number.
#[async_trait]
pub trait RoleRegistry: Send + Sync {
    /// Fetches the role lists for a login.
    ///
    /// # Errors
    ///
    /// - `AuthError::PrincipalNotFound` when the registry answers 401
    /// - `AuthError::IntegrationUnavailable` for any other status or transport failure
    async fn fetch_roles(&self, login: &str) -> AuthResult<RoleRegistryPayload>;
}

/// Password and profile operations on the external identity system.
#[async_trait]
pub trait PasswordDirectory: Send + Sync {
    /// Replaces the external password of a login.
    ///
    /// # Errors
    ///
    /// - `AuthError::PasswordRejected` when the identity system refuses the password
    /// - `AuthError::IntegrationUnavailable` for any other failure
    async fn change_password(&self, login: &str, new_password: &str) -> AuthResult<()>;

    /// Fetches the profile registered for a login.
    ///
    /// # Errors
    ///
    /// - `AuthError::PrincipalNotFound` when the identity system has no data
    /// - `AuthError::IntegrationUnavailable` on transport failure
    async fn profile(&self, login: &str) -> AuthResult<DirectoryProfile>;
}
