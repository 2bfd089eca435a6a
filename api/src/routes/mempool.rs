//! Mempool endpoints

use crate::models::{
    MempoolResponse, MempoolTransactionRequest, MempoolTransactionResponse, NetworkRequest,
};
use crate::services::MempoolService;
use crate::{ApiResult, ApiState};
use axum::{extract::State, routing::post, Json, Router};

/// Register mempool routes
pub fn mempool_routes() -> Router<ApiState> {
    Router::new()
        .route("/", post(mempool))
        .route("/transaction", post(mempool_transaction))
}

async fn mempool(
    State(state): State<ApiState>,
    Json(req): Json<NetworkRequest>,
) -> ApiResult<Json<MempoolResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = MempoolService::new(state.node.clone(), state.ledger.clone());
    Ok(Json(MempoolResponse {
        transaction_identifiers: service.pending().await?,
    }))
}

async fn mempool_transaction(
    State(state): State<ApiState>,
    Json(req): Json<MempoolTransactionRequest>,
) -> ApiResult<Json<MempoolTransactionResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = MempoolService::new(state.node.clone(), state.ledger.clone());
    let transaction = service.transaction(&req.transaction_identifier.hash).await?;
    Ok(Json(MempoolTransactionResponse {
        transaction,
        metadata: None,
    }))
}
