use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use cosign_crypto::transaction_identity;
use cosign_network::GossipPublisher;
use cosign_types::Envelope;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{state::AppState, ApiResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTxRequest {
    /// Base64 XDR `TransactionEnvelope`, partially signed.
    pub xdr: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTxResponse {
    pub accepted: bool,
}

/// POST /tx
///
/// Validates the envelope and republishes it on the gossip topic. Merging
/// happens when the node's own collector receives the looped-back copy.
pub async fn submit_transaction(
    State(state): State<AppState>,
    payload: Result<Json<SubmitTxRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitTxResponse>)> {
    let Json(request) = payload?;
    let envelope = Envelope::from_base64(&request.xdr)?;
    let identity = transaction_identity(&envelope, &state.network_passphrase)?;

    info!(
        "tx {} accepted from client: sig count: {}",
        identity,
        envelope.signature_count()
    );

    state.publisher.publish(envelope.to_xdr()?).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitTxResponse { accepted: true }),
    ))
}
