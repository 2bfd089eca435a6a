//! API routes organization
//!
//! One POST endpoint per Rosetta call, grouped the way the Rosetta API
//! groups them:
//! - `network` - identifiers, node status and options
//! - `account` - balances and coins
//! - `block` - blocks and block transactions
//! - `mempool` - pending transactions
//! - `construction` - building, signing and submitting transactions

mod account;
mod block;
mod construction;
mod mempool;
mod network;

use crate::ApiState;
use axum::{routing::get, Router};

/// Create the main router with all API endpoints
pub fn create_routes() -> Router<ApiState> {
    Router::new()
        .route("/", get(root))
        .nest("/network", network::network_routes())
        .nest("/account", account::account_routes())
        .nest("/block", block::block_routes())
        .nest("/mempool", mempool::mempool_routes())
        .nest("/construction", construction::construction_routes())
}

async fn root() -> &'static str {
    "Theta Rosetta API"
}
