use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request, header::CONTENT_DISPOSITION},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    services::{compress_pdf, convert_image, health, index, merge_pdf, preflight},
    state::AppState,
};
use crate::config::{Config, CorsConfig};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the application router
///
/// The body ceiling is enforced by [`RequestBodyLimitLayer`] for the whole request;
/// axum's own per-extractor default is disabled so the configured limit is the only one.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes.as_usize();
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/convert-image", post(convert_image).options(preflight))
        .route("/compress-pdf", post(compress_pdf).options(preflight))
        .route("/merge-pdf", post(merge_pdf).options(preflight))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::now_v7(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION])
}

/// Serve until Ctrl+C or SIGTERM; `address` overrides `server.bind_addr`
pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);
    let state = AppState::new(config);

    match state.locator.locate() {
        Some(path) => info!(path = %path.display(), "Ghostscript available"),
        None => warn!("Ghostscript not found; PDF compression will use the in-process rewrite"),
    }

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "convertbox listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
