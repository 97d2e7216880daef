use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, Request};
use axum::routing::get;
use axum::Router;
use http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use http::Method;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod client;
mod config;
pub mod handlers;
mod health;

pub use config::Config;

use crate::ServiceState;

pub const CONNECTOR_PATH: &str = "/connector";
const STATUS_PREFIX: &str = "/_status";

/// Build the full application router: connector, health and volume files.
pub fn router(config: &Config, state: ServiceState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(config.log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let connector_cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![ACCEPT, ORIGIN, CONTENT_TYPE])
        .allow_origin(Any)
        .allow_credentials(false);

    let mut router = Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .route(
            CONNECTOR_PATH,
            get(handlers::connector::get_handler)
                .post(handlers::connector::post_handler)
                .layer(connector_cors),
        );

    if config.serve_volumes {
        router = mount_volumes(router, &state);
    }

    router
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(config.body_limit))
        .with_state(state)
        .layer(trace_layer)
}

fn mount_volumes(
    mut router: Router<ServiceState>,
    state: &ServiceState,
) -> Router<ServiceState> {
    let mut mounted = HashSet::new();

    for volume in state.registry().list() {
        let Some(path) = mount_path(volume.url()) else {
            tracing::debug!(volume = %volume.id(), url = %volume.url(), "volume url not served here");
            continue;
        };
        if !mounted.insert(path.clone()) {
            tracing::warn!(volume = %volume.id(), %path, "volume url already mounted, skipping");
            continue;
        }

        tracing::info!(volume = %volume.id(), %path, "serving volume files");
        let volume = Arc::clone(volume);
        router = router.route(
            &format!("{}/*rest", path),
            get(move |Path(rest): Path<String>, request: Request| {
                handlers::volume_files::serve(volume, rest, request)
            }),
        );
    }

    router
}

/// Route prefix for a volume url this server can serve: a relative url
/// that does not shadow the connector or status routes.
fn mount_path(url: &str) -> Option<String> {
    if !url.starts_with('/') || url.starts_with("//") {
        return None;
    }

    let path = url.trim_end_matches('/');
    let reserved = path.is_empty()
        || path == CONNECTOR_PATH
        || path == STATUS_PREFIX
        || path.starts_with(&format!("{}/", STATUS_PREFIX))
        || path
            .chars()
            .any(|c| matches!(c, ':' | '*' | '?' | '#' | '{' | '}'));

    (!reserved).then(|| path.to_string())
}

/// Run the HTTP server until the shutdown signal fires.
pub async fn run(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let app = router(&config, state);

    tracing::info!(addr = ?listen_addr, "connector listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
