//! HTTP server module.
//!
//! Provides the axum-based JSON API: public reads for every resource,
//! identity-gated updates and deletes for the editable ones, request
//! tracing and graceful shutdown.

pub mod config;
pub mod envelope;
pub mod handlers;
pub mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    middleware as axum_mw,
    routing::{get, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::errors::{FolioError, Result};
use crate::forms::{
    UpdateForm, EDUCATION_FORM, PROJECT_FORM, SKILL_FORM, WORK_EXPERIENCE_FORM,
};
use crate::normalize::Normalizer;
use crate::store::{Entity, Store};
use config::{collection_path, ServerConfig, SHUTDOWN_TIMEOUT_SECS};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
///
/// The store is built once at startup and injected here; handlers never
/// reach for a global client.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub normalizer: Normalizer,
    /// Key that establishes an identity for writes.
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, normalizer: Normalizer, api_key: Option<String>) -> Self {
        Self {
            store,
            normalizer,
            api_key,
        }
    }
}

// ---------------------------------------------------------------------------
// ShutdownHandle
// ---------------------------------------------------------------------------

/// Handle returned by `start_server` that allows triggering graceful shutdown.
pub struct ShutdownHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl ShutdownHandle {
    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal the server to begin graceful shutdown without waiting.
    ///
    /// Returns `Err` if the server already stopped.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.shutdown_tx.take() {
            Some(tx) => tx.send(()).map_err(|_| FolioError::Server {
                status: 500,
                message: "Server already stopped".into(),
            }),
            None => Ok(()),
        }
    }

    /// Signal shutdown and wait up to `SHUTDOWN_TIMEOUT_SECS` for
    /// in-flight requests to finish.
    pub async fn stop(mut self) -> Result<()> {
        // A server that already exited has nothing left to drain.
        let _ = self.shutdown();
        match tokio::time::timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), self.task).await {
            Ok(Ok(())) => {
                tracing::info!("HTTP server stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(FolioError::Server {
                status: 500,
                message: format!("Server task failed: {}", e),
            }),
            Err(_) => {
                tracing::warn!(
                    "in-flight requests still running after {}s, giving up",
                    SHUTDOWN_TIMEOUT_SECS
                );
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the full axum router.
///
/// Reads are mounted directly. `PUT` and `DELETE` on the editable
/// resources carry the identity middleware as a route layer, so it runs
/// before the body is read or storage is touched.
pub fn build_router(state: Arc<AppState>) -> Router {
    let articles = collection_path(Entity::Article);
    let categories = collection_path(Entity::ArticleCategory);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(articles, get(handlers::list_articles))
        .route(&format!("{articles}/{{slug}}"), get(handlers::show_article))
        .route(categories, get(handlers::list_categories))
        .route(&format!("{categories}/{{key}}"), get(handlers::show_category));

    for form in [&SKILL_FORM, &PROJECT_FORM, &EDUCATION_FORM, &WORK_EXPERIENCE_FORM] {
        router = router.merge(resource_routes(&state, form));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// List, show, update and delete routes for one editable resource.
fn resource_routes(state: &Arc<AppState>, form: &'static UpdateForm) -> Router<Arc<AppState>> {
    let entity = form.entity;
    let base = collection_path(entity);

    let writes = put(
        move |State(state): State<Arc<AppState>>, Path(id): Path<String>, body: Bytes| async move {
            handlers::update_record(&state, form, &id, &body).await
        },
    )
    .delete(
        move |State(state): State<Arc<AppState>>, Path(id): Path<String>| async move {
            handlers::delete_record(&state, entity, &id).await
        },
    )
    .route_layer(axum_mw::from_fn_with_state(
        Arc::clone(state),
        middleware::require_identity,
    ));

    Router::new()
        .route(
            base,
            get(move |State(state): State<Arc<AppState>>| async move {
                handlers::list_records(&state, entity, None).await
            }),
        )
        .route(
            &format!("{base}/{{id}}"),
            get(
                move |State(state): State<Arc<AppState>>, Path(id): Path<String>| async move {
                    handlers::show_record(&state, entity, &id).await
                },
            )
            .merge(writes),
        )
}

// ---------------------------------------------------------------------------
// Server startup
// ---------------------------------------------------------------------------

/// Bind the listener and serve the API on a background task.
///
/// Returns a `ShutdownHandle` that triggers graceful shutdown.
pub async fn start_server(config: ServerConfig, state: Arc<AppState>) -> Result<ShutdownHandle> {
    config.validate()?;

    let router = build_router(state);
    let addr = config.addr();

    let listener = TcpListener::bind(&addr).await.map_err(|e| FolioError::Server {
        status: 500,
        message: format!("Failed to bind to {}: {}", addr, e),
    })?;

    let local_addr = listener.local_addr().map_err(|e| FolioError::Server {
        status: 500,
        message: format!("Failed to get local address: {}", e),
    })?;

    tracing::info!(
        addr = %local_addr,
        writes_enabled = config.api_key.is_some(),
        "HTTP server starting"
    );
    for endpoint in self::config::endpoint_configurations() {
        tracing::debug!(
            method = %endpoint.method,
            path = %endpoint.path,
            auth = endpoint.requires_auth,
            "{}",
            endpoint.description
        );
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(graceful_shutdown_signal(shutdown_rx));

        if let Err(e) = serve.await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(ShutdownHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
        local_addr,
    })
}

/// Resolves when the shutdown signal is received or the handle is dropped.
async fn graceful_shutdown_signal(shutdown_rx: oneshot::Receiver<()>) {
    let _ = shutdown_rx.await;
    tracing::info!(
        "Shutdown signal received, allowing {}s for in-flight requests",
        SHUTDOWN_TIMEOUT_SECS
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
