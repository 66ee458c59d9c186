//! HTTP server setup and registry route handlers
//!
//! Routes:
//!
//! | Method | Path            | Handler                         |
//! |--------|-----------------|---------------------------------|
//! | POST   | `/package`      | [`crate::ingest::create_package`] |
//! | DELETE | `/package/{id}` | [`delete_package`]              |
//! | DELETE | `/reset`        | [`reset_registry`]              |
//!
//! Any other path, or another method on a known path, answers
//! `404 {"error": "Not Found"}`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderValue, Method},
    routing::{delete, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::ingest::create_package;
use crate::state::{AppState, SuccessResponse};
use crate::storage::{key_prefix, object_key};
use crate::types::ResetResponse;
use crate::validation;

/// Build the application router around `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_request_body_size_bytes();
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .route("/package", post(create_package).fallback(not_found))
        .route("/package/{id}", delete(delete_package).fallback(not_found))
        .route("/reset", delete(reset_registry).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Handler for `DELETE /package/{id}`.
pub async fn delete_package(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    let id = validation::validate_package_id(&id)?;
    let key = object_key(state.key_prefix(), id);

    if !state.store.object_exists(&key).await? {
        return Err(AppError::NotFound(format!("Package not found: {}", id)));
    }

    state.store.delete_object(&key).await?;
    info!(id = %id, key = %key, "Package deleted");

    Ok(Json(SuccessResponse {
        message: format!("Package {} deleted", id),
    }))
}

/// Handler for `DELETE /reset`: removes every stored package.
pub async fn reset_registry(State(state): State<Arc<AppState>>) -> AppResult<Json<ResetResponse>> {
    let prefix = key_prefix(state.key_prefix());
    let deleted = state.store.delete_prefix(&prefix).await?;
    info!(prefix = %prefix, deleted, "Registry reset");

    Ok(Json(ResetResponse {
        message: "Registry is reset".to_string(),
        deleted,
    }))
}

async fn not_found() -> AppError {
    AppError::UnknownRoute
}

/// Validate `config`, build the state it describes, and serve until Ctrl+C
/// or SIGTERM.
pub async fn run_server(config: Config) -> Result<()> {
    validation::validate_hostname(&config.server.host)
        .with_context(|| format!("Invalid host parameter '{}'", config.server.host))?;
    config.validate()?;

    let host = config.server.host.clone();
    let port = config.server.port;
    info!(
        host = %host,
        port,
        backend = ?config.storage.backend,
        bucket = %config.storage.bucket,
        "Starting package registry server"
    );

    let state = AppState::from_config(config).context("Failed to initialise object store")?;
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|e| {
        error!(host = %host, port, error = %e, "Invalid socket address");
        anyhow::anyhow!("Invalid socket address {}:{}: {}", host, port, e)
    })?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
