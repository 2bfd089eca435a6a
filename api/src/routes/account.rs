//! Account endpoints

use crate::models::{
    AccountBalanceRequest, AccountBalanceResponse, AccountCoinsRequest, AccountCoinsResponse,
};
use crate::services::AccountService;
use crate::{ApiResult, ApiState};
use axum::{extract::State, routing::post, Json, Router};

pub fn account_routes() -> Router<ApiState> {
    Router::new()
        .route("/balance", post(balance))
        .route("/coins", post(coins))
}

async fn balance(
    State(state): State<ApiState>,
    Json(req): Json<AccountBalanceRequest>,
) -> ApiResult<Json<AccountBalanceResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = AccountService::new(state.node.clone());
    let (block_identifier, balances, metadata) = service
        .balance(
            &req.account_identifier.address,
            req.block_identifier.as_ref(),
            req.currencies.as_deref(),
        )
        .await?;

    Ok(Json(AccountBalanceResponse {
        block_identifier,
        balances,
        metadata: Some(metadata),
    }))
}

async fn coins(
    State(state): State<ApiState>,
    Json(req): Json<AccountCoinsRequest>,
) -> ApiResult<Json<AccountCoinsResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = AccountService::new(state.node.clone());
    let (block_identifier, coins, metadata) = service
        .coins(&req.account_identifier.address, req.currencies.as_deref())
        .await?;

    Ok(Json(AccountCoinsResponse {
        block_identifier,
        coins,
        metadata: Some(metadata),
    }))
}
