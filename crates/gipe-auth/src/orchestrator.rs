//! Login orchestration.
//!
//! [`AuthenticationOrchestrator`] drives one login request from the raw
//! identifier to an issued token pair:
//!
//! ```text
//! received -> normalizing -> rf (external) | cpf (local) -> role resolved
//!          -> persisted -> token issued
//! ```
//!
//! Any step may reject the request. No local row is written until the
//! external identity system has accepted the credentials and a role was
//! selected.

use std::sync::Arc;

use crate::AuthResult;
use crate::error::AuthError;
use crate::identifier::LoginIdentifier;
use crate::integration::{CredentialChecker, RoleRegistryPayload, RoleRegistry};
use crate::password::{dummy_hash, hash_password_async, verify_password_async};
use crate::policy::RoleAuthorizationPolicy;
use crate::storage::IdentityStore;
use crate::token::JwtService;
use crate::types::{AuthenticationOutcome, Network, Principal, ReconciledIdentity};

/// Runs the login flow.
#[derive(Clone)]
pub struct AuthenticationOrchestrator {
    credentials: Arc<dyn CredentialChecker>,
    roles: Arc<dyn RoleRegistry>,
    store: Arc<dyn IdentityStore>,
    tokens: JwtService,
}

impl AuthenticationOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialChecker>,
        roles: Arc<dyn RoleRegistry>,
        store: Arc<dyn IdentityStore>,
        tokens: JwtService,
    ) -> Self {
        Self {
            credentials,
            roles,
            store,
            tokens,
        }
    }

    /// Authenticates a login/password pair.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an identifier that is neither RF nor CPF
    /// - `InvalidCredentials` for a rejected password or unknown CPF
    /// - `NotAuthorized` when no allowed role is found
    /// - `IntegrationUnavailable` when an external call fails
    /// - `PersistenceConflict` / `PersistenceFailure` when the local write fails
    pub async fn authenticate(
        &self,
        raw_login: &str,
        password: &str,
    ) -> AuthResult<AuthenticationOutcome> {
        let identifier = match LoginIdentifier::parse(raw_login) {
            Ok(identifier) => identifier,
            Err(e) => {
                tracing::info!(login = %raw_login, "rejected malformed login identifier");
                return Err(e);
            }
        };

        let result = match &identifier {
            LoginIdentifier::Rf(rf) => self.authenticate_rf(rf, password).await,
            LoginIdentifier::Cpf(cpf) => self.authenticate_cpf(cpf, password).await,
        };

        match &result {
            Ok(outcome) => tracing::info!(
                login = %identifier,
                role = outcome.role.codigo,
                "login succeeded"
            ),
            Err(e) if e.is_persistence_error() => tracing::error!(
                login = %identifier,
                category = %e.category(),
                error = %e,
                "local write failed after external authentication"
            ),
            Err(e) if e.is_server_error() => tracing::error!(
                login = %identifier,
                category = %e.category(),
                error = %e,
                "login failed"
            ),
            Err(e) => tracing::warn!(
                login = %identifier,
                category = %e.category(),
                error = %e,
                "login rejected"
            ),
        }

        result
    }

    async fn authenticate_rf(
        &self,
        rf: &str,
        password: &str,
    ) -> AuthResult<AuthenticationOutcome> {
        let payload = self.credentials.check_credentials(rf, password).await?;

        let registry = match self.roles.fetch_roles(rf).await {
            Ok(registry) => registry,
            Err(AuthError::PrincipalNotFound { message }) => {
                tracing::info!(
                    login = %rf,
                    reason = %message,
                    "role registry has no entry, trying fallbacks"
                );
                RoleRegistryPayload::default()
            }
            Err(e) => return Err(e),
        };

        let local = self.store.find_by_login(rf).await?;
        let selection = RoleAuthorizationPolicy::select_authorized_role(
            &registry,
            local.as_ref().map(|p| &p.role),
            payload.profile_names(),
        )
        .ok_or_else(|| AuthError::not_authorized(payload.first_name()))?;

        tracing::debug!(
            login = %rf,
            role = %selection.role,
            source = ?selection.source,
            "role selected"
        );

        let identity = ReconciledIdentity {
            username: rf.to_string(),
            name: payload.nome.clone(),
            cpf: payload.document().to_string(),
            email: payload.email.clone().filter(|e| !e.trim().is_empty()),
            password_hash: hash_password_async(password.to_string()).await?,
            role: selection.role,
        };
        let principal = self.store.upsert_reconciled(&identity).await?;

        self.outcome(principal).await
    }

    async fn authenticate_cpf(
        &self,
        cpf: &str,
        password: &str,
    ) -> AuthResult<AuthenticationOutcome> {
        let Some(principal) = self.store.find_by_cpf(cpf).await? else {
            tracing::info!(login = %cpf, "no local principal for cpf");
            verify_password_async(password.to_string(), dummy_hash().to_string()).await;
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_async(password.to_string(), principal.password_hash.clone()).await {
            return Err(AuthError::InvalidCredentials);
        }

        if principal.network != Network::Indireta {
            tracing::info!(
                login = %cpf,
                network = %principal.network,
                "cpf login outside indirect network"
            );
            return Err(AuthError::not_authorized(principal.first_name()));
        }

        self.store.record_login(principal.id).await?;
        self.outcome(principal).await
    }

    async fn outcome(&self, principal: Principal) -> AuthResult<AuthenticationOutcome> {
        let units = self.store.units_for(principal.id).await?;
        let tokens = self.tokens.issue_pair(&principal)?;

        Ok(AuthenticationOutcome {
            name: principal.name,
            email: principal.email.unwrap_or_default(),
            cpf: principal.cpf,
            login: principal.username,
            role: principal.role,
            units,
            tokens,
        })
    }
}
