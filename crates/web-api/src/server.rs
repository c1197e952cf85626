use crate::auth::{self, AccessGate};
use crate::{handlers, health};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use solomon_core::{MetricsReader, SyncRunner, UserDirectory};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<dyn SyncRunner>,
    pub metrics: Arc<dyn MetricsReader>,
    pub users: Arc<dyn UserDirectory>,
    pub gate: Arc<AccessGate>,
}

pub struct ApiServer {
    state: AppState,
    gate: Arc<AccessGate>,
    protect_sync: bool,
}

impl ApiServer {
    #[must_use]
    pub fn new(
        sync: Arc<dyn SyncRunner>,
        metrics: Arc<dyn MetricsReader>,
        users: Arc<dyn UserDirectory>,
        gate: Arc<AccessGate>,
    ) -> Self {
        Self {
            state: AppState {
                sync,
                metrics,
                users,
                gate: gate.clone(),
            },
            gate,
            protect_sync: false,
        }
    }

    /// Also require a bearer token on `POST /run`.
    #[must_use]
    pub fn protect_sync(mut self, protect: bool) -> Self {
        self.protect_sync = protect;
        self
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        // Layers on a method router wrap only the methods registered before
        // them, so OPTIONS and the 405 fallback stay open.
        let metrics = get(handlers::get_metrics)
            .route_layer(middleware::from_fn_with_state(
                self.gate.clone(),
                auth::require_bearer,
            ))
            .options(handlers::preflight)
            .fallback(handlers::method_not_allowed("GET, OPTIONS"));

        let mut run = post(handlers::run_sync);
        if self.protect_sync {
            run = run.route_layer(middleware::from_fn_with_state(
                self.gate.clone(),
                auth::require_bearer,
            ));
        }
        let run = run.fallback(handlers::method_not_allowed("POST"));

        let login = post(handlers::login)
            .fallback(handlers::method_not_allowed("POST"));

        Router::new()
            .route("/login", login)
            .route("/run", run)
            .route("/metrics", metrics)
            .route("/health", get(health::health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, protect_sync = self.protect_sync, "web API listening");

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
