use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router, error_handling::HandleErrorLayer, extract::DefaultBodyLimit,
    middleware::from_fn_with_state, routing::get,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use warden_auth::{AuthComponents, InMemoryCredentialStore, SystemClock, authenticate};

use crate::{config::AppConfig, handlers};

pub struct WardenServer {
    addr: SocketAddr,
    app: Router,
    auth: AuthComponents,
}

/// Builds the application router around an already wired auth subsystem.
pub fn build_app(cfg: &AppConfig, auth: &AuthComponents) -> Router {
    let state = auth.state();
    let body_limit = cfg.server.body_limit_bytes;
    let request_timeout = Duration::from_millis(cfg.server.request_timeout_ms);

    // Routes that see the caller's identity
    let identified = Router::new()
        .route("/", get(handlers::root))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(identified)
        .merge(warden_auth::http::router(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handlers::handle_middleware_error))
                .load_shed()
                .concurrency_limit(cfg.server.max_concurrent_requests)
                .timeout(request_timeout),
        )
}

/// Wires the auth subsystem from configuration.
///
/// Credentials come from the `users` table of the configuration.
pub fn build_auth(cfg: &AppConfig) -> anyhow::Result<AuthComponents> {
    let credentials = InMemoryCredentialStore::with_users(
        cfg.users
            .iter()
            .map(|user| (user.username.clone(), user.password.as_str())),
    )?;
    if credentials.is_empty() {
        tracing::warn!("no users configured; every login will fail");
    }

    let auth = AuthComponents::build(
        cfg.auth.clone(),
        Arc::new(credentials),
        Arc::new(SystemClock),
    )?;
    Ok(auth)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
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

    pub fn build(self) -> anyhow::Result<WardenServer> {
        let auth = build_auth(&self.config)?;
        let app = build_app(&self.config, &auth);

        Ok(WardenServer {
            addr: self.addr,
            app,
            auth,
        })
    }
}

impl WardenServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let sweeper = self.auth.spawn_sweeper();

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let result = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        result?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
