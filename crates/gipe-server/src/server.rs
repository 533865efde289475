use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{Request, Response},
    routing::get,
};
use gipe_auth::{
    AuthState, IdentityStore, LoggingResetNotifier, SmeIntegrationClient, router as auth_router,
};
use gipe_auth_postgres::PostgresIdentityStore;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::config::AppConfig;

pub struct GipeServer {
    addr: SocketAddr,
    app: Router,
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_app(cfg: &AppConfig, state: AuthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(auth_router(state))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &Request<_>| {
                            // Liveness probes would drown the access log.
                            if req.uri().path() == "/healthz" {
                                return tracing::span!(tracing::Level::TRACE, "noop");
                            }
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri().path(),
                                http.status_code = tracing::field::Empty,
                            )
                        })
                        .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                            span.record(
                                "http.status_code",
                                tracing::field::display(res.status().as_u16()),
                            );
                            if span.metadata().is_some_and(|meta| meta.name() != "noop") {
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            }
                        }),
                )
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<Arc<dyn IdentityStore>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses the given store instead of connecting to PostgreSQL.
    pub fn with_identity_store(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> anyhow::Result<GipeServer> {
        let store = match self.store {
            Some(store) => store,
            None => connect_store(&self.config).await?,
        };

        let integration = Arc::new(
            SmeIntegrationClient::new(&self.config.auth.integration)
                .context("failed to create integration client")?,
        );
        let state = AuthState::new(
            &self.config.auth,
            integration,
            store,
            Arc::new(LoggingResetNotifier),
        );

        Ok(GipeServer {
            addr: self.addr,
            app: build_app(&self.config, state),
        })
    }
}

async fn connect_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn IdentityStore>> {
    let pg = &cfg.storage.postgres;
    let storage = PostgresIdentityStore::connect(&pg.to_pool_config())
        .await
        .context("failed to connect to PostgreSQL")?;

    if pg.run_migrations {
        storage
            .migrate()
            .await
            .context("failed to apply database migrations")?;
    } else {
        tracing::info!("storage.postgres.run_migrations is false, skipping migrations");
    }

    Ok(Arc::new(storage.identity_store()))
}

impl GipeServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn into_router(self) -> Router {
        self.app
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
