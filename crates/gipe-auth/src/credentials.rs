//! Password lifecycle: forgot password, reset by link, authenticated change.
//!
//! The external identity system owns the password. Every change is sent
//! there first and the local hash is only replaced after it was accepted, so
//! a rejected or failed external call leaves the local row untouched.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::identifier::anonymize_email;
use crate::integration::PasswordDirectory;
use crate::password::{hash_password_async, verify_password_async};
use crate::reset::ResetLinkSigner;
use crate::storage::IdentityStore;
use crate::types::Principal;

/// Message for a password and confirmation that differ.
pub const PASSWORD_MISMATCH_MESSAGE: &str = "As senhas não conferem.";
/// Message for a reset link pointing at an unknown principal.
pub const UNKNOWN_PRINCIPAL_MESSAGE: &str = "Usuário não encontrado.";
/// Message for a reset token that fails verification.
pub const INVALID_RESET_TOKEN_MESSAGE: &str = "Token inválido ou expirado.";
/// Message for a wrong current password.
pub const WRONG_CURRENT_PASSWORD_MESSAGE: &str = "Senha atual incorreta.";
/// Message for a blank new password.
pub const EMPTY_PASSWORD_MESSAGE: &str = "A nova senha não pode ser vazia.";

/// Delivers reset links to users.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    /// Sends the reset link to the principal's e-mail address.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed off.
    async fn send_reset_link(
        &self,
        principal: &Principal,
        email: &str,
        link: &str,
    ) -> AuthResult<()>;
}

/// Notifier that only records the dispatch in the logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingResetNotifier;

#[async_trait]
impl ResetNotifier for LoggingResetNotifier {
    async fn send_reset_link(
        &self,
        principal: &Principal,
        email: &str,
        _link: &str,
    ) -> AuthResult<()> {
        tracing::info!(
            login = %principal.username,
            email = %anonymize_email(email),
            "password reset link issued"
        );
        Ok(())
    }
}

/// Result of a forgot-password request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// The link was sent to the anonymized address.
    Sent {
        /// Masked recipient address.
        email: String,
    },
    /// The identity system has no e-mail for the user.
    NoRegisteredEmail,
    /// The identity system has no data for the user.
    ProfileNotFound,
}

/// Password reset and change operations.
#[derive(Clone)]
pub struct CredentialLifecycleService {
    directory: Arc<dyn PasswordDirectory>,
    store: Arc<dyn IdentityStore>,
    signer: ResetLinkSigner,
    notifier: Arc<dyn ResetNotifier>,
}

impl CredentialLifecycleService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        directory: Arc<dyn PasswordDirectory>,
        store: Arc<dyn IdentityStore>,
        signer: ResetLinkSigner,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        Self {
            directory,
            store,
            signer,
            notifier,
        }
    }

    /// Starts the forgot-password flow for a login.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when the login is not known locally
    /// - `IntegrationUnavailable` when the identity system cannot be reached
    /// - any error raised by the notifier
    pub async fn request_reset(&self, username: &str) -> AuthResult<ResetRequestOutcome> {
        let username = username.trim();
        let Some(principal) = self.store.find_by_login(username).await? else {
            tracing::info!(login = %username, "password reset requested for unknown login");
            return Err(AuthError::invalid_input(format!(
                "Usuário {username} não encontrado."
            )));
        };

        let profile = match self.directory.profile(username).await {
            Ok(profile) => profile,
            Err(AuthError::PrincipalNotFound { .. }) => {
                tracing::info!(login = %username, "identity system has no profile for login");
                return Ok(ResetRequestOutcome::ProfileNotFound);
            }
            Err(e) => return Err(e),
        };

        let Some(email) = profile.registered_email() else {
            tracing::info!(login = %username, "password reset refused, no registered e-mail");
            return Ok(ResetRequestOutcome::NoRegisteredEmail);
        };

        let link = self.signer.reset_link(&principal)?;
        self.notifier.send_reset_link(&principal, email, &link).await?;

        Ok(ResetRequestOutcome::Sent {
            email: anonymize_email(email),
        })
    }

    /// Sets a new password through a signed reset link.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for mismatched passwords, a malformed uid, an unknown
    ///   principal or a bad token
    /// - `PasswordRejected` when the identity system refuses the password
    /// - `IntegrationUnavailable` / `PersistenceFailure` on infrastructure errors
    pub async fn reset_with_token(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> AuthResult<()> {
        check_new_password(new_password, confirmation)?;

        let id = ResetLinkSigner::decode_uid(uid)?;
        let principal = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::invalid_input(UNKNOWN_PRINCIPAL_MESSAGE))?;

        if !self.signer.check_token(&principal, token) {
            tracing::info!(login = %principal.username, "reset token rejected");
            return Err(AuthError::invalid_input(INVALID_RESET_TOKEN_MESSAGE));
        }

        self.apply(&principal, new_password).await?;
        tracing::info!(login = %principal.username, "password reset through link");
        Ok(())
    }

    /// Changes the password of an authenticated principal.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for mismatched passwords or a wrong current password
    /// - `InvalidToken` when the principal no longer exists
    /// - `PasswordRejected` when the identity system refuses the password
    /// - `IntegrationUnavailable` / `PersistenceFailure` on infrastructure errors
    pub async fn change_password(
        &self,
        principal_id: Uuid,
        current_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> AuthResult<()> {
        check_new_password(new_password, confirmation)?;

        let principal = self
            .store
            .find_by_id(principal_id)
            .await?
            .ok_or_else(|| AuthError::invalid_token("Usuário não encontrado."))?;

        let current_matches =
            verify_password_async(current_password.to_string(), principal.password_hash.clone())
                .await;
        if !current_matches {
            return Err(AuthError::invalid_input(WRONG_CURRENT_PASSWORD_MESSAGE));
        }

        self.apply(&principal, new_password).await?;
        tracing::info!(login = %principal.username, "password changed");
        Ok(())
    }

    /// External first, local second.
    async fn apply(&self, principal: &Principal, new_password: &str) -> AuthResult<()> {
        self.directory
            .change_password(&principal.username, new_password)
            .await?;

        let hash = hash_password_async(new_password.to_string()).await?;
        if let Err(e) = self.store.update_password_hash(principal.id, &hash).await {
            tracing::error!(
                login = %principal.username,
                error = %e,
                "external password changed but local hash update failed"
            );
            return Err(e);
        }
        Ok(())
    }
}

fn check_new_password(new_password: &str, confirmation: &str) -> AuthResult<()> {
    if new_password != confirmation {
        return Err(AuthError::invalid_input(PASSWORD_MISMATCH_MESSAGE));
    }
    if new_password.trim().is_empty() {
        return Err(AuthError::invalid_input(EMPTY_PASSWORD_MESSAGE));
    }
    Ok(())
}
