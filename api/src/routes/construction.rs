//! Construction endpoints
//!
//! Derive, hash and parse work without a node. Metadata and submit need one
//! and are refused in offline mode.

use crate::models::{
    ConstructionCombineRequest, ConstructionCombineResponse, ConstructionDeriveRequest,
    ConstructionDeriveResponse, ConstructionHashRequest, ConstructionMetadataRequest,
    ConstructionMetadataResponse, ConstructionParseRequest, ConstructionParseResponse,
    ConstructionPayloadsRequest, ConstructionPayloadsResponse, ConstructionPreprocessRequest,
    ConstructionPreprocessResponse, ConstructionSubmitRequest, TransactionIdentifier,
    TransactionIdentifierResponse,
};
use crate::services::{construction, ConstructionService};
use crate::{ApiResult, ApiState};
use axum::{extract::State, routing::post, Json, Router};
use rosetta_core::Metadata;

pub fn construction_routes() -> Router<ApiState> {
    Router::new()
        .route("/derive", post(derive))
        .route("/preprocess", post(preprocess))
        .route("/metadata", post(metadata))
        .route("/payloads", post(payloads))
        .route("/parse", post(parse))
        .route("/combine", post(combine))
        .route("/hash", post(hash))
        .route("/submit", post(submit))
}

async fn derive(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionDeriveRequest>,
) -> ApiResult<Json<ConstructionDeriveResponse>> {
    state.check_network_if_present(req.network_identifier.as_ref())?;

    let account_identifier = construction::derive(req.public_key.as_ref())?;
    Ok(Json(ConstructionDeriveResponse {
        account_identifier,
        metadata: None,
    }))
}

async fn preprocess(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionPreprocessRequest>,
) -> ApiResult<Json<ConstructionPreprocessResponse>> {
    state.check_network(req.network_identifier.as_ref())?;

    let options = construction::preprocess(&req.operations, req.metadata.as_ref())?;
    Ok(Json(ConstructionPreprocessResponse { options }))
}

async fn metadata(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionMetadataRequest>,
) -> ApiResult<Json<ConstructionMetadataResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = ConstructionService::new(state.chain_id.clone(), state.node.clone());
    let options = req.options.unwrap_or_default();
    let (metadata, suggested_fee) = service.metadata(&options).await?;
    Ok(Json(ConstructionMetadataResponse {
        metadata,
        suggested_fee,
    }))
}

async fn payloads(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionPayloadsRequest>,
) -> ApiResult<Json<ConstructionPayloadsResponse>> {
    state.check_network(req.network_identifier.as_ref())?;

    let metadata = req.metadata.unwrap_or_else(Metadata::new);
    let (unsigned_transaction, payload) =
        construction::payloads(&state.chain_id, &req.operations, &metadata)?;
    Ok(Json(ConstructionPayloadsResponse {
        unsigned_transaction,
        payloads: vec![payload],
    }))
}

async fn parse(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionParseRequest>,
) -> ApiResult<Json<ConstructionParseResponse>> {
    state.check_network(req.network_identifier.as_ref())?;

    let (operations, metadata, account_identifier_signers) =
        construction::parse(&req.transaction, req.signed)?;
    Ok(Json(ConstructionParseResponse {
        operations,
        account_identifier_signers,
        metadata: Some(metadata),
    }))
}

async fn combine(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionCombineRequest>,
) -> ApiResult<Json<ConstructionCombineResponse>> {
    state.check_network(req.network_identifier.as_ref())?;

    let signed_transaction =
        construction::combine(&state.chain_id, &req.unsigned_transaction, &req.signatures)?;
    Ok(Json(ConstructionCombineResponse { signed_transaction }))
}

async fn hash(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionHashRequest>,
) -> ApiResult<Json<TransactionIdentifierResponse>> {
    state.check_network_if_present(req.network_identifier.as_ref())?;

    let hash = construction::hash(&req.signed_transaction)?;
    Ok(Json(TransactionIdentifierResponse {
        transaction_identifier: TransactionIdentifier {
            hash: hash.to_hex(),
        },
        metadata: None,
    }))
}

async fn submit(
    State(state): State<ApiState>,
    Json(req): Json<ConstructionSubmitRequest>,
) -> ApiResult<Json<TransactionIdentifierResponse>> {
    state.require_online()?;
    state.check_network(req.network_identifier.as_ref())?;

    let service = ConstructionService::new(state.chain_id.clone(), state.node.clone());
    let hash = service.submit(&req.signed_transaction).await?;
    Ok(Json(TransactionIdentifierResponse {
        transaction_identifier: TransactionIdentifier {
            hash: hash.to_hex(),
        },
        metadata: None,
    }))
}
