//! Block endpoints

use crate::models::{BlockRequest, BlockResponse, BlockTransactionRequest, BlockTransactionResponse};
use crate::services::BlockService;
use crate::{ApiError, ApiResult, ApiState};
use axum::{extract::State, routing::post, Json, Router};

pub fn block_routes() -> Router<ApiState> {
    Router::new()
        .route("/", post(block))
        .route("/transaction", post(block_transaction))
}

async fn block(
    State(state): State<ApiState>,
    Json(req): Json<BlockRequest>,
) -> ApiResult<Json<BlockResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = BlockService::new(state.node.clone(), state.ledger.clone());
    let block = service.block(&req.block_identifier).await?;
    Ok(Json(BlockResponse { block }))
}

async fn block_transaction(
    State(state): State<ApiState>,
    Json(req): Json<BlockTransactionRequest>,
) -> ApiResult<Json<BlockTransactionResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = BlockService::new(state.node.clone(), state.ledger.clone());
    let transaction = service
        .transaction(
            &req.transaction_identifier.hash,
            ApiError::UnableToGetBlockTransaction,
        )
        .await?;
    Ok(Json(BlockTransactionResponse { transaction }))
}
