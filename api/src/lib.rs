//! Theta Rosetta API
//!
//! axum server exposing the Rosetta Data and Construction APIs on top of a
//! Theta node.

mod error;
pub mod models;
mod routes;
pub mod services;
mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiState, ROSETTA_VERSION};

use axum::http::{header::CONTENT_TYPE, Method};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Router with every endpoint, CORS and request tracing
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    routes::create_routes()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_server(addr: SocketAddr, state: ApiState) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "rosetta server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
