//! HTTP surface for density estimates.
//!
//! ## Endpoints
//!
//! - `POST /ai/estimate_density` with body `{"brand": "..."}`; `?debug=1`
//!   adds pipeline diagnostics to the response
//! - anything else answers `{"ok": true}` as a liveness check

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use kibble_search::{EstimateError, Estimator};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Result, ServiceError};

/// Path of the estimation endpoint.
pub const ESTIMATE_PATH: &str = "/ai/estimate_density";

#[derive(Clone)]
struct AppState {
    estimator: Arc<Estimator>,
}

#[derive(Debug, Default, Deserialize)]
struct EstimateParams {
    #[serde(default)]
    debug: Option<String>,
}

impl EstimateParams {
    fn debug(&self) -> bool {
        self.debug.as_deref() == Some("1")
    }
}

/// Build the router serving `estimator`.
pub fn router(estimator: Arc<Estimator>) -> Router {
    Router::new()
        .route(
            ESTIMATE_PATH,
            post(handle_estimate).fallback(handle_fallback),
        )
        .fallback(handle_fallback)
        .with_state(AppState { estimator })
}

/// Estimation server running in a background task.
pub struct EstimateServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl EstimateServer {
    /// Bind to `{config.host}:{config.port}` (port `0` auto-assigns) and
    /// serve until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bind`] if the TCP listener cannot bind.
    pub async fn start(
        estimator: Arc<Estimator>,
        config: &ServerConfig,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServiceError::Bind(format!("{bind_addr}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Bind(format!("failed to get local addr: {e}")))?;

        info!("estimate server listening on http://{addr}{ESTIMATE_PATH}");

        let app = router(estimator);
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::error!("estimate server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the server task to finish.
    pub async fn wait(&mut self) {
        if let Err(e) = (&mut self.handle).await {
            if !e.is_cancelled() {
                tracing::error!("estimate server task failed: {e}");
            }
        }
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for EstimateServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn failed(message: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "failed", "message": message.to_string() })),
    )
        .into_response()
}

/// `POST /ai/estimate_density`
async fn handle_estimate(
    State(state): State<AppState>,
    Query(params): Query<EstimateParams>,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable request body");
            return failed(e);
        }
    };
    let brand = payload.get("brand").and_then(Value::as_str).unwrap_or("");

    match state.estimator.estimate(brand, params.debug()).await {
        Ok(result) => Json(result).into_response(),
        Err(EstimateError::BrandRequired) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": EstimateError::BrandRequired.to_string() })),
        )
            .into_response(),
        Err(err @ EstimateError::Internal(_)) => failed(err),
    }
}

/// Every other route and method.
async fn handle_fallback() -> Json<Value> {
    Json(json!({ "ok": true }))
}
