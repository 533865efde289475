//! PostgreSQL storage backend for GIPE Auth
//!
//! Provides persistent storage for:
//!
//! - Roles mirrored from the external role registry (`cargo`)
//! - Principals (`usuario`)
//! - Organizational units and their assignment to principals (`unidade`,
//!   `usuario_unidades`)
//!
//! The schema ships as embedded migrations (see [`migrations`]) and is applied
//! at startup when enabled.
//!
//! # Example
//!
//! ```ignore
//! use gipe_auth_postgres::{PostgresConfig, PostgresIdentityStore};
//!
//! let store = PostgresIdentityStore::connect(&PostgresConfig::new("postgres://localhost/gipe")).await?;
//! store.migrate().await?;
//!
//! let principal = store.users().find_by_login("1234567").await?;
//! ```

pub mod cargo;
pub mod config;
pub mod migrations;
pub mod pool;
pub mod storage_adapters;
pub mod unidade;
pub mod user;

use std::sync::Arc;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use cargo::CargoStorage;
pub use config::PostgresConfig;
pub use storage_adapters::ArcIdentityStore;
pub use unidade::UnidadeStorage;
pub use user::UserStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists or violates a uniqueness constraint.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Wraps a database error, turning unique violations into `Conflict`.
    #[must_use]
    pub fn from_write(e: sqlx_core::Error, context: &str) -> Self {
        if let sqlx_core::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::conflict(format!(
                "{context}: {}",
                db_err.constraint().unwrap_or("unique constraint")
            ));
        }
        Self::Database(e)
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if this is an invalid input error.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns `true` if this is a client error (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Conflict(_) | Self::InvalidInput(_)
        )
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Migration(_))
    }
}

impl From<StorageError> for gipe_auth::AuthError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict(msg) => Self::persistence_conflict(msg),
            StorageError::InvalidInput(msg) => Self::invalid_input(msg),
            other => Self::persistence_failure(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Combined Storage
// =============================================================================

/// Combined PostgreSQL storage for the identity tables.
///
/// Owns the connection pool and hands out the per-table storages.
#[derive(Clone)]
pub struct PostgresIdentityStore {
    pool: Arc<PgPool>,
}

impl PostgresIdentityStore {
    /// Create from an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create from an Arc-wrapped pool.
    #[must_use]
    pub fn from_arc(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Connect using the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(config: &PostgresConfig) -> StorageResult<Self> {
        let pool = pool::create_pool(config).await?;
        Ok(Self::new(pool))
    }

    /// Applies pending embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Migration` if a migration fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Principal storage.
    #[must_use]
    pub fn users(&self) -> UserStorage<'_> {
        UserStorage::new(&self.pool)
    }

    /// Role storage.
    #[must_use]
    pub fn cargos(&self) -> CargoStorage<'_> {
        CargoStorage::new(&self.pool)
    }

    /// Organizational unit storage.
    #[must_use]
    pub fn unidades(&self) -> UnidadeStorage<'_> {
        UnidadeStorage::new(&self.pool)
    }

    /// Arc-owning adapter implementing [`gipe_auth::IdentityStore`].
    #[must_use]
    pub fn identity_store(&self) -> ArcIdentityStore {
        ArcIdentityStore::new(Arc::clone(&self.pool))
    }
}
