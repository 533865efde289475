//! In-memory identity store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::IdentityStore;
use crate::AuthResult;
use crate::error::AuthError;
use crate::types::{Principal, ReconciledIdentity, Role, UnitSummary};

/// Identity store kept in process memory.
///
/// Counts every write so tests can assert that a failed flow left the store
/// untouched.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    principals: RwLock<HashMap<Uuid, Principal>>,
    roles: RwLock<HashMap<i32, Role>>,
    units: RwLock<HashMap<Uuid, Vec<UnitSummary>>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryIdentityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a principal without counting it as a write.
    pub async fn insert(&self, principal: Principal) {
        self.roles
            .write()
            .await
            .insert(principal.role.codigo, principal.role.clone());
        self.principals.write().await.insert(principal.id, principal);
    }

    /// Assigns units to a principal.
    pub async fn assign_units(&self, id: Uuid, units: Vec<UnitSummary>) {
        self.units.write().await.insert(id, units);
    }

    /// Returns the stored roles ordered by code.
    pub async fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        roles.sort_by_key(|r| r.codigo);
        roles
    }

    /// Returns the number of stored principals.
    pub async fn principal_count(&self) -> usize {
        self.principals.read().await.len()
    }

    /// Returns the number of writes performed through [`IdentityStore`].
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent write fail with `PersistenceFailure`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn begin_write(&self) -> AuthResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuthError::persistence_failure("writes disabled"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_login(&self, username: &str) -> AuthResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .await
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn find_by_cpf(&self, cpf: &str) -> AuthResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .await
            .values()
            .find(|p| p.cpf == cpf)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Principal>> {
        Ok(self.principals.read().await.get(&id).cloned())
    }

    async fn upsert_reconciled(&self, identity: &ReconciledIdentity) -> AuthResult<Principal> {
        self.begin_write()?;

        // Both locks are held for the whole upsert so it is atomic.
        let mut roles = self.roles.write().await;
        let mut principals = self.principals.write().await;

        if principals
            .values()
            .any(|p| p.cpf == identity.cpf && p.username != identity.username)
        {
            return Err(AuthError::persistence_conflict(format!(
                "cpf already bound to another login (login={})",
                identity.username
            )));
        }

        roles.insert(identity.role.codigo, identity.role.clone());

        let existing = principals
            .values()
            .find(|p| p.username == identity.username)
            .cloned();
        let mut principal = existing.unwrap_or_else(|| {
            Principal::builder(identity.username.clone()).build()
        });
        principal.name = identity.name.clone();
        principal.cpf = identity.cpf.clone();
        principal.email = identity.email.clone();
        principal.password_hash = identity.password_hash.clone();
        principal.role = identity.role.clone();
        principal.is_validated = true;
        principal.is_externally_provisioned = true;
        principal.last_login = Some(OffsetDateTime::now_utc());

        principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn record_login(&self, id: Uuid) -> AuthResult<()> {
        self.begin_write()?;
        if let Some(principal) = self.principals.write().await.get_mut(&id) {
            principal.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AuthResult<()> {
        self.begin_write()?;
        match self.principals.write().await.get_mut(&id) {
            Some(principal) => {
                principal.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(AuthError::persistence_failure(format!(
                "principal {id} not found"
            ))),
        }
    }

    async fn units_for(&self, id: Uuid) -> AuthResult<Vec<UnitSummary>> {
        Ok(self.units.read().await.get(&id).cloned().unwrap_or_default())
    }
}
