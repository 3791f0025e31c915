//! HTTP exporter for a running scan session.
//!
//! Serves `/metrics` (Prometheus text), `/health` (session phase) and
//! `/status` (the latest snapshot as JSON). The scan loop stays
//! synchronous; it pushes snapshots into [`MetricsState`] and the server
//! reads them from its own runtime.

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Default exporter port.
pub const DEFAULT_METRICS_PORT: u16 = 9464;

/// Shared handle the scan loop writes and the handlers read.
pub type SharedMetricsState = Arc<RwLock<MetricsState>>;

/// Errors from running the exporter.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind metrics listener: {0}")]
    Bind(#[from] std::io::Error),

    /// The server stopped with an error.
    #[error("metrics server error: {0}")]
    Server(String),
}

/// Where the exporter listens. Loopback only unless configured otherwise.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(DEFAULT_METRICS_PORT)
    }
}

impl MetricsServerConfig {
    /// Listens on loopback at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], port)),
        }
    }
}

/// Session phase as seen by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No snapshot has arrived yet.
    Waiting,
    /// The last snapshot came from an active session.
    Scanning,
    /// The session has closed.
    Closed,
}

impl SessionPhase {
    fn label(self) -> &'static str {
        match self {
            SessionPhase::Waiting => "WAITING",
            SessionPhase::Scanning => "SCANNING",
            SessionPhase::Closed => "CLOSED",
        }
    }
}

/// Latest session figures held for the handlers.
pub struct MetricsState {
    registry: MetricsRegistry,
    phase: SessionPhase,
    latest: MetricsSnapshot,
}

impl MetricsState {
    /// Wraps `registry` before any snapshot has arrived.
    pub fn new(registry: MetricsRegistry) -> Self {
        Self {
            registry,
            phase: SessionPhase::Waiting,
            latest: MetricsSnapshot::default(),
        }
    }

    /// Records a snapshot pushed by the scan loop.
    pub fn update(&mut self, snapshot: &MetricsSnapshot) {
        self.phase = if snapshot.is_active {
            SessionPhase::Scanning
        } else {
            SessionPhase::Closed
        };
        self.registry.update(snapshot);
        self.latest = snapshot.clone();
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }
}

/// Builds the exporter routes over `state`.
pub fn router(state: SharedMetricsState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Prometheus exporter for one scan session.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: SharedMetricsState,
}

impl MetricsServer {
    /// Creates a server that has not started listening.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState::new(registry))),
        }
    }

    /// Handle for pushing snapshots.
    pub fn state(&self) -> SharedMetricsState {
        Arc::clone(&self.state)
    }

    /// Serves until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Serves until `shutdown` resolves, then drains open connections.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Metrics exporter listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("Metrics exporter stopped");
        Ok(())
    }
}

async fn metrics_handler(State(state): State<SharedMetricsState>) -> Response {
    let state = state.read().await;
    match state.registry.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// 200 while waiting or scanning; 503 once the session has closed.
async fn health_handler(State(state): State<SharedMetricsState>) -> Response {
    let phase = state.read().await.phase;
    let status = match phase {
        SessionPhase::Closed => StatusCode::SERVICE_UNAVAILABLE,
        SessionPhase::Waiting | SessionPhase::Scanning => StatusCode::OK,
    };
    (status, phase.label()).into_response()
}

async fn status_handler(State(state): State<SharedMetricsState>) -> Json<MetricsSnapshot> {
    Json(state.read().await.latest.clone())
}
