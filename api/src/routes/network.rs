//! Network endpoints

use crate::models::{
    MetadataRequest, NetworkListResponse, NetworkOptionsResponse, NetworkRequest,
    NetworkStatusResponse,
};
use crate::services::{network, NetworkService};
use crate::{ApiResult, ApiState};
use axum::{extract::State, routing::post, Json, Router};

pub fn network_routes() -> Router<ApiState> {
    Router::new()
        .route("/list", post(list))
        .route("/status", post(status))
        .route("/options", post(options))
}

async fn list(
    State(state): State<ApiState>,
    Json(_req): Json<MetadataRequest>,
) -> ApiResult<Json<NetworkListResponse>> {
    Ok(Json(NetworkListResponse {
        network_identifiers: vec![state.network_identifier()],
    }))
}

async fn status(
    State(state): State<ApiState>,
    Json(req): Json<NetworkRequest>,
) -> ApiResult<Json<NetworkStatusResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = NetworkService::new(state.node.clone());
    Ok(Json(service.status(req.metadata.as_ref()).await?))
}

async fn options(
    State(state): State<ApiState>,
    Json(req): Json<NetworkRequest>,
) -> ApiResult<Json<NetworkOptionsResponse>> {
    state.check_network(req.network_identifier.as_ref())?;
    Ok(Json(network::options(&state.rosetta_version)))
}
