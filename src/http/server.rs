//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all science handler
//! - Wire up middleware (tracing)
//! - Bind server to listener, plus the admin API when enabled
//! - Acknowledge every caller with a fixed `200 OK`
//!
//! The backends' real responses are never relayed to the caller.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::admin::setup_admin_router;
use crate::config::ScienceConfig;
use crate::dispatch::Dispatcher;
use crate::forward::TargetError;
use crate::stats::DiffAggregator;

/// Body returned to every caller.
pub const ACKNOWLEDGEMENT: &str = "OK";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<ScienceConfig>,
}

/// HTTP server for the science proxy.
pub struct ScienceServer {
    router: Router,
    state: AppState,
}

impl ScienceServer {
    /// Create a new server. The aggregator is shared with the caller so
    /// statistics stay observable from outside.
    pub fn new(config: ScienceConfig, aggregator: Arc<DiffAggregator>) -> Result<Self, TargetError> {
        let dispatcher = Arc::new(Dispatcher::from_config(&config, aggregator)?);
        let state = AppState {
            dispatcher,
            config: Arc::new(config),
        };

        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(science_handler))
            .route("/", any(science_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The shadow router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let config = &self.state.config;
        tracing::info!(
            address = %addr,
            control = %self.state.dispatcher.control(),
            experiment = %self.state.dispatcher.experiment(),
            mode = %config.comparison.mode,
            "HTTP server starting"
        );

        if config.admin.enabled {
            let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
            let admin_router = setup_admin_router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %config.admin.bind_address, "Admin API starting");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Shadow handler: forward to both backends, compare, then acknowledge with `OK`
/// whatever the outcome.
async fn science_handler(State(state): State<AppState>, request: Request<Body>) -> impl IntoResponse {
    let outcome = state.dispatcher.handle(request).await;
    tracing::trace!(outcome = outcome.as_str(), "Request handled");
    (StatusCode::OK, ACKNOWLEDGEMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::MemorySink;
    use tower::ServiceExt;

    async fn dead_backend_server() -> (ScienceServer, Arc<DiffAggregator>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut config = ScienceConfig::default();
        config.backends.control = addr.clone();
        config.backends.experiment = addr;
        let aggregator = Arc::new(DiffAggregator::new(Box::new(MemorySink::new())).unwrap());
        (ScienceServer::new(config, aggregator.clone()).unwrap(), aggregator)
    }

    #[tokio::test]
    async fn caller_is_acknowledged_even_when_backends_are_down() {
        let (server, aggregator) = dead_backend_server().await;

        for uri in ["/", "/deep/path?q=1"] {
            let response = server
                .router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], ACKNOWLEDGEMENT.as_bytes());
        }

        assert_eq!(aggregator.snapshot().total_requests, 2);
    }
}
