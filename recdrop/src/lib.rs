//! # recdrop: upload endpoint for browser audio recordings
//!
//! `recdrop` is a small HTTP service that accepts `audio/webm` recordings as multipart uploads and
//! stores each one in a local directory as `recording_<room>_<timestamp>.webm`.
//!
//! ## Request Flow
//!
//! Every request passes through the same stack, outermost first:
//!
//! 1. **Tracing** ([`tower_http::trace::TraceLayer`]) logs the request and its response.
//! 2. **CORS** ([`tower_http::cors::CorsLayer`]) answers preflight `OPTIONS` requests and adds the
//!    `Access-Control-*` headers for allow-listed origins.
//! 3. **Access guard** ([`guard::access_guard`]) blocks requests from other origins with 403 and,
//!    when an upload token is configured, requires `Authorization: Bearer <token>`.
//! 4. **Routes**: `GET /health`, `POST /upload` and `GET /openapi.json`.
//!
//! An upload streams through the validator ([`upload::validator`]) into a temporary file owned by
//! the storage writer ([`upload::storage`]). Once the whole body has been read, the filename is
//! derived from the `room` and `timestamp` fields ([`upload::filename`]) and the temporary file
//! is renamed into place.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use recdrop::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = recdrop::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     recdrop::telemetry::init_telemetry(config.log_format)?;
//!
//!     let app = Application::new(config).await?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod errors;
pub mod guard;
mod openapi;
pub mod telemetry;
pub mod upload;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;

pub use config::Config;

use crate::{
    guard::{AccessPolicy, access_guard},
    openapi::ApiDoc,
    upload::{LocalStorage, UploadLimits},
};

/// Room left in the request body limit for multipart boundaries, part headers and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// Everything in here is read-only after startup, so cloning the state per request only bumps
/// reference counts.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .policy(Arc::new(AccessPolicy::from_config(&config)))
///     .limits(Arc::new(UploadLimits::from_config(&config.limits)))
///     .storage(Arc::new(storage))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub policy: Arc<AccessPolicy>,
    pub limits: Arc<UploadLimits>,
    pub storage: Arc<LocalStorage>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {origin:?}"))?;
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request());

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Layers are applied inside out: the access guard wraps the routes, CORS wraps the guard so that
/// preflight requests are answered before any check runs, and tracing wraps everything.
///
/// # Errors
///
/// Returns an error if the CORS configuration contains an origin that is not a valid header value.
#[instrument(skip_all)]
pub fn build_router(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let body_limit = usize::try_from(state.limits.max_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let router = Router::new()
        .route("/health", get(api::handlers::health::health))
        .route(
            "/upload",
            post(api::handlers::upload::upload_recording).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(from_fn_with_state(state.clone(), access_guard))
        .with_state(state);

    let router = router.layer(create_cors_layer(config)?);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The upload server, ready to serve.
///
/// 1. **Create**: [`Application::new`] prepares the upload directory and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!(
            host = %config.host,
            port = config.port,
            upload_dir = %config.upload_dir.display(),
            token_required = config.upload_token.is_some(),
            allowed_origins = ?config.cors.allowed_origins,
            max_upload_mb = config.limits.max_upload_mb,
            "Starting upload server"
        );

        let storage = LocalStorage::init(&config.upload_dir)
            .await
            .with_context(|| format!("Failed to prepare upload directory {}", config.upload_dir.display()))?;
        info!(upload_dir = %storage.dir().display(), "Storing recordings");

        let state = AppState::builder()
            .policy(Arc::new(AccessPolicy::from_config(&config)))
            .limits(Arc::new(UploadLimits::from_config(&config.limits)))
            .storage(Arc::new(storage))
            .build();

        let router = build_router(state, &config)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Upload server listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Upload server stopped");
        Ok(())
    }
}
