use cosign_types::{CosignError, Result};
use tokio::sync::mpsc;

/// A payload delivered on the transaction topic. The payload is an opaque
/// XDR envelope; decoding is the receiver's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GossipMessage {
    /// Publishing peer, when known.
    pub source: Option<String>,
    pub data: Vec<u8>,
}

impl GossipMessage {
    pub fn new(source: Option<String>, data: Vec<u8>) -> Self {
        Self { source, data }
    }
}

/// Receive side of the topic.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<GossipMessage>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<GossipMessage>) -> Self {
        Self { rx }
    }

    /// A detached subscription fed by the returned sender.
    pub fn channel() -> (mpsc::UnboundedSender<GossipMessage>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Waits for the next message. Fails with `SubscriptionClosed` once the
    /// feeding side is gone.
    pub async fn next(&mut self) -> Result<GossipMessage> {
        self.rx.recv().await.ok_or(CosignError::SubscriptionClosed)
    }
}
