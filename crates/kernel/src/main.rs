//! Quaderno Journal Kernel
//!
//! HTTP server for a personal journal: authenticated entry CRUD, the
//! filtered/paginated listing path, and attachment storage.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use quaderno_kernel::config::Config;
use quaderno_kernel::file::MAX_ATTACHMENT_BYTES;
use quaderno_kernel::middleware;
use quaderno_kernel::routes;
use quaderno_kernel::state::AppState;

/// Per-request timeout; the service itself never retries or waits longer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Quaderno journal kernel");

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, "Configuration loaded");

    // Initialize application state (pool, migrations, services)
    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    info!("Database connection established");

    let cors = build_cors_layer(&config);

    // Build the router
    let app = Router::new()
        .merge(routes::entry::router())
        .merge(routes::search::router())
        .merge(routes::file::router())
        .merge(routes::health::router())
        .merge(routes::metrics::router())
        // Middleware, outermost first in request flow:
        // trace → CORS → compression → timeout → body limit → metrics → auth → routes
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 64 * 1024))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::track_requests,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::authenticate_bearer,
                )),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}

/// Initialize tracing with env-filter (RUST_LOG) and a default of info.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
