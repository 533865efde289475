//! Arc-owning storage adapter for the login and credential flows.
//!
//! Wraps the lifetime-based storage types and owns an `Arc<PgPool>`, so it
//! can be handed to the services as `Arc<dyn IdentityStore>`.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use gipe_auth::storage::IdentityStore;
use gipe_auth::{AuthResult, Principal, ReconciledIdentity, UnitSummary};

use crate::PgPool;
use crate::unidade::UnidadeStorage;
use crate::user::UserStorage;

/// Arc-owning PostgreSQL identity store.
#[derive(Clone)]
pub struct ArcIdentityStore {
    pool: Arc<PgPool>,
}

impl ArcIdentityStore {
    /// Create a new Arc-owning identity store.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for ArcIdentityStore {
    async fn find_by_login(&self, username: &str) -> AuthResult<Option<Principal>> {
        let storage = UserStorage::new(&self.pool);
        Ok(storage.find_by_login(username).await?.map(Principal::from))
    }

    async fn find_by_cpf(&self, cpf: &str) -> AuthResult<Option<Principal>> {
        let storage = UserStorage::new(&self.pool);
        Ok(storage.find_by_cpf(cpf).await?.map(Principal::from))
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Principal>> {
        let storage = UserStorage::new(&self.pool);
        Ok(storage.find_by_id(id).await?.map(Principal::from))
    }

    async fn upsert_reconciled(&self, identity: &ReconciledIdentity) -> AuthResult<Principal> {
        let storage = UserStorage::new(&self.pool);
        let row = storage.upsert_reconciled(identity).await?;
        Ok(row.into())
    }

    async fn record_login(&self, id: Uuid) -> AuthResult<()> {
        let storage = UserStorage::new(&self.pool);
        Ok(storage.record_login(id).await?)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AuthResult<()> {
        let storage = UserStorage::new(&self.pool);
        Ok(storage.update_password_hash(id, password_hash).await?)
    }

    async fn units_for(&self, id: Uuid) -> AuthResult<Vec<UnitSummary>> {
        let storage = UnidadeStorage::new(&self.pool);
        Ok(storage.units_for_user(id).await?)
    }
}
