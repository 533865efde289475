//! HTTP handlers for the login and credential endpoints.
//!
//! # Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `POST /login` | [`login::login_handler`] |
//! | `POST /verify-token` | [`token::verify_token_handler`] |
//! | `POST /token/refresh` | [`token::refresh_handler`] |
//! | `POST /esqueci-senha` | [`password::forgot_password_handler`] |
//! | `POST /redefinir-senha` | [`password::reset_password_handler`] |
//! | `POST /atualizar-senha` | [`password::change_password_handler`] |
//!
//! # Usage
//!
//! ```ignore
//! use gipe_auth::http::{AuthState, router};
//!
//! let state = AuthState::new(&config.auth, integration, store, notifier);
//! let app = axum::Router::new().merge(router(state));
//! ```

pub mod error;
pub mod extract;
pub mod login;
pub mod password;
pub mod token;

use std::sync::Arc;

use axum::{Router, routing::post};

use crate::config::AuthConfig;
use crate::credentials::{CredentialLifecycleService, ResetNotifier};
use crate::integration::{CredentialChecker, PasswordDirectory, RoleRegistry};
use crate::orchestrator::AuthenticationOrchestrator;
use crate::reset::ResetLinkSigner;
use crate::storage::IdentityStore;
use crate::token::JwtService;

pub use error::detail;
pub use extract::BearerAuth;

// =============================================================================
// State Types
// =============================================================================

/// Shared state for every auth handler.
#[derive(Clone)]
pub struct AuthState {
    /// Login flow.
    pub orchestrator: Arc<AuthenticationOrchestrator>,
    /// Password lifecycle.
    pub credentials: Arc<CredentialLifecycleService>,
    /// Token issuing and validation.
    pub jwt: Arc<JwtService>,
    /// Local identity store.
    pub store: Arc<dyn IdentityStore>,
}

impl AuthState {
    /// Wires the services over one integration client and one store.
    pub fn new<I>(
        config: &AuthConfig,
        integration: Arc<I>,
        store: Arc<dyn IdentityStore>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self
    where
        I: CredentialChecker + RoleRegistry + PasswordDirectory + 'static,
    {
        let jwt = JwtService::new(&config.token);
        let orchestrator = AuthenticationOrchestrator::new(
            integration.clone(),
            integration.clone(),
            store.clone(),
            jwt.clone(),
        );
        let credentials = CredentialLifecycleService::new(
            integration,
            store.clone(),
            ResetLinkSigner::new(&config.password_reset),
            notifier,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            credentials: Arc::new(credentials),
            jwt: Arc::new(jwt),
            store,
        }
    }
}

/// Builds the auth router.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/login", post(login::login_handler))
        .route("/verify-token", post(token::verify_token_handler))
        .route("/token/refresh", post(token::refresh_handler))
        .route("/esqueci-senha", post(password::forgot_password_handler))
        .route("/redefinir-senha", post(password::reset_password_handler))
        .route("/atualizar-senha", post(password::change_password_handler))
        .with_state(state)
}
