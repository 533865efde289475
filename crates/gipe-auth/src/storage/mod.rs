//! Identity store trait.
//!
//! Defines the local persistence operations the login and credential flows
//! need. The PostgreSQL implementation lives in `gipe-auth-postgres`;
//! [`InMemoryIdentityStore`] backs tests and local development.

mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{Principal, ReconciledIdentity, UnitSummary};

pub use memory::InMemoryIdentityStore;

/// Storage operations for principals and their roles.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find a principal by login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PersistenceFailure` if the lookup fails.
    async fn find_by_login(&self, username: &str) -> AuthResult<Option<Principal>>;

    /// Find a principal by CPF.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PersistenceFailure` if the lookup fails.
    async fn find_by_cpf(&self, cpf: &str) -> AuthResult<Option<Principal>>;

    /// Find a principal by surrogate key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PersistenceFailure` if the lookup fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Principal>>;

    /// Upserts the role (by code) and the principal (by login) atomically.
    ///
    /// Marks the principal validated and externally provisioned and refreshes
    /// its last login.
    ///
    /// # Errors
    ///
    /// - `AuthError::PersistenceConflict` on an integrity violation
    /// - `AuthError::PersistenceFailure` on any other database error
    async fn upsert_reconciled(&self, identity: &ReconciledIdentity) -> AuthResult<Principal>;

    /// Refreshes the last-login timestamp.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PersistenceFailure` if the update fails.
    async fn record_login(&self, id: Uuid) -> AuthResult<()>;

    /// Replaces the stored password hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PersistenceFailure` if the update fails.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AuthResult<()>;

    /// Lists the organizational units assigned to a principal.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PersistenceFailure` if the lookup fails.
    async fn units_for(&self, id: Uuid) -> AuthResult<Vec<UnitSummary>>;
}
