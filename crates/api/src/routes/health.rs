use axum::{extract::State, Json};
use cosign_crypto::network_id;
use serde::Serialize;

use crate::state::AppState;

/// Liveness plus the network this node hashes transactions for. Clients can
/// compare `network_id` before posting envelopes signed for another network.
#[derive(Debug, Serialize)]
pub struct NodeHealth {
    pub status: &'static str,
    pub network_passphrase: String,
    pub network_id: String,
    pub version: &'static str,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<NodeHealth> {
    Json(NodeHealth {
        status: "healthy",
        network_passphrase: state.network_passphrase.to_string(),
        network_id: hex::encode(network_id(&state.network_passphrase).0),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /
pub async fn banner() -> &'static str {
    "cosign-node: POST /tx with {\"xdr\": \"<base64 TransactionEnvelope>\"}\n"
}
