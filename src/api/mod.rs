//! REST API and WebSocket server for managing simulated systems
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **SystemStore** shared by all handlers, one [`System`](crate::System) per id
//! - **WebSocket** streaming the metrics channel of a system
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/systems` - Create a system with the default topology
//! - `GET /api/systems/:system_id` - Node/edge graph
//! - `PUT /api/systems/:system_id/start` - Start or restart the simulation
//! - `WS /api/systems/:system_id/metrics` - Metrics stream
//! - `POST|DELETE /api/systems/:system_id/nodes` - Add / remove nodes
//! - `PATCH /api/systems/:system_id/nodes/:node_id` - Move a node
//! - `POST|DELETE /api/systems/:system_id/edges` - Add / remove edges

pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::{ApiState, SystemStore};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, patch, post, put},
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::util::{get_bind_addr, is_production};

/// Origin of the development dashboard
pub const DEV_ORIGIN: &str = "http://localhost:5173";

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Enable CORS for the development dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: get_bind_addr(),
            enable_cors: !is_production(),
        }
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(HeaderValue::from_static(DEV_ORIGIN))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the router with all routes
pub fn router(state: ApiState, config: &ApiConfig) -> Router {
    let app = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/systems", post(routes::systems::create_system))
        .route("/api/systems/:system_id", get(routes::systems::get_system))
        .route(
            "/api/systems/:system_id/start",
            put(routes::systems::start_system),
        )
        .route(
            "/api/systems/:system_id/metrics",
            get(websocket::metrics_handler),
        )
        .route(
            "/api/systems/:system_id/nodes",
            post(routes::nodes::create_node).delete(routes::nodes::delete_nodes),
        )
        .route(
            "/api/systems/:system_id/nodes/:node_id",
            patch(routes::nodes::update_node),
        )
        .route(
            "/api/systems/:system_id/edges",
            post(routes::edges::create_edge).delete(routes::edges::delete_edges),
        )
        .with_state(state);

    if config.enable_cors {
        app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors()),
        )
    } else {
        app.layer(TraceLayer::new_for_http())
    }
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state, &config);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
