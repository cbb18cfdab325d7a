use cosign_network::GossipPublisher;
use std::sync::Arc;

/// Shared state handed to every handler. The ingress holds no transaction
/// state of its own; it only needs to hash and publish.
#[derive(Clone)]
pub struct AppState {
    pub network_passphrase: Arc<str>,
    pub publisher: Arc<dyn GossipPublisher>,
}

impl AppState {
    pub fn new(network_passphrase: &str, publisher: Arc<dyn GossipPublisher>) -> Self {
        Self {
            network_passphrase: Arc::from(network_passphrase),
            publisher,
        }
    }
}
