use cosign_types::MAX_ENVELOPE_BYTES;
use libp2p::{
    gossipsub::{self, IdentTopic, MessageId},
    identify,
    identity::Keypair,
    mdns,
    ping,
    swarm::{behaviour::toggle::Toggle, NetworkBehaviour},
    PeerId,
};
use std::error::Error;
use std::time::Duration;

pub const DEFAULT_TOPIC: &str = "txs";

#[derive(NetworkBehaviour)]
pub struct CosignBehavior {
    pub gossipsub: gossipsub::Behaviour,
    pub identify: identify::Behaviour,
    pub ping: ping::Behaviour,
    pub mdns: Toggle<mdns::tokio::Behaviour>,
}

impl CosignBehavior {
    pub fn new(keypair: Keypair, enable_mdns: bool) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let local_peer_id = PeerId::from(keypair.public());

        // Same payload from different publishers is a different message.
        let message_id_fn = |message: &gossipsub::Message| {
            let mut s = std::collections::hash_map::DefaultHasher::new();
            use std::hash::{Hash, Hasher};
            message.data.hash(&mut s);
            message.source.hash(&mut s);
            MessageId::from(s.finish().to_string())
        };

        let gossipsub_config = gossipsub::ConfigBuilder::default()
            .heartbeat_interval(Duration::from_secs(1))
            .validation_mode(gossipsub::ValidationMode::Strict)
            .message_id_fn(message_id_fn)
            .max_transmit_size(MAX_ENVELOPE_BYTES)
            .build()
            .map_err(|e| format!("Invalid gossipsub config: {}", e))?;

        let gossipsub = gossipsub::Behaviour::new(
            gossipsub::MessageAuthenticity::Signed(keypair.clone()),
            gossipsub_config,
        )?;

        let identify = identify::Behaviour::new(identify::Config::new(
            "/cosign/1.0.0".to_string(),
            keypair.public(),
        ));

        let ping = ping::Behaviour::new(ping::Config::new());

        let mdns = if enable_mdns {
            Some(mdns::tokio::Behaviour::new(mdns::Config::default(), local_peer_id)?)
        } else {
            None
        };

        Ok(Self {
            gossipsub,
            identify,
            ping,
            mdns: Toggle::from(mdns),
        })
    }

    pub fn subscribe_to_topic(&mut self, topic: &IdentTopic) -> Result<bool, String> {
        self.gossipsub
            .subscribe(topic)
            .map_err(|e| format!("Failed to subscribe: {:?}", e))
    }
}
