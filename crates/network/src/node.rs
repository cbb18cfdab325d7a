use crate::behavior::{CosignBehavior, CosignBehaviorEvent};
use crate::messages::{GossipMessage, Subscription};
use async_trait::async_trait;
use cosign_types::{CosignError, Result};
use futures::StreamExt;
use libp2p::{
    gossipsub::{self, IdentTopic, PublishError},
    identify,
    identity::Keypair,
    mdns, noise,
    swarm::SwarmEvent,
    tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder,
};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

enum Command {
    Publish {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Anything that can put a payload on the transaction topic.
#[async_trait]
pub trait GossipPublisher: Send + Sync {
    async fn publish(&self, data: Vec<u8>) -> Result<()>;
}

/// Cloneable publish side of a running [`P2PNode`].
#[derive(Clone)]
pub struct GossipHandle {
    commands: mpsc::Sender<Command>,
}

#[async_trait]
impl GossipPublisher for GossipHandle {
    async fn publish(&self, data: Vec<u8>) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Publish { data, reply })
            .await
            .map_err(|_| CosignError::NetworkError("P2P node is not running".to_string()))?;

        response
            .await
            .map_err(|_| CosignError::NetworkError("P2P node dropped publish request".to_string()))?
    }
}

pub struct P2PNode {
    swarm: Swarm<CosignBehavior>,
    topic: IdentTopic,
    commands: mpsc::Receiver<Command>,
    inbound: mpsc::UnboundedSender<GossipMessage>,
}

impl P2PNode {
    /// Builds the swarm and subscribes to `topic`. The node does nothing
    /// until [`P2PNode::run`] is polled.
    pub fn new(
        keypair: Keypair,
        topic: &str,
        enable_mdns: bool,
    ) -> Result<(Self, GossipHandle, Subscription)> {
        let local_peer_id = PeerId::from(keypair.public());
        info!("Local peer id: {}", local_peer_id);

        let mut swarm = SwarmBuilder::with_existing_identity(keypair)
            .with_tokio()
            .with_tcp(
                tcp::Config::default(),
                noise::Config::new,
                yamux::Config::default,
            )
            .map_err(|e| CosignError::NetworkError(format!("Failed to configure TCP: {}", e)))?
            .with_behaviour(|key| CosignBehavior::new(key.clone(), enable_mdns))
            .map_err(|e| CosignError::NetworkError(format!("Failed to create behaviour: {}", e)))?
            .with_swarm_config(|c| c.with_idle_connection_timeout(Duration::from_secs(60)))
            .build();

        let topic = IdentTopic::new(topic);
        swarm
            .behaviour_mut()
            .subscribe_to_topic(&topic)
            .map_err(CosignError::NetworkError)?;

        info!("Subscribed to topic {} (mdns: {})", topic, enable_mdns);

        let (command_tx, command_rx) = mpsc::channel(64);
        let (inbound, subscription) = Subscription::channel();

        let node = Self {
            swarm,
            topic,
            commands: command_rx,
            inbound,
        };

        Ok((node, GossipHandle { commands: command_tx }, subscription))
    }

    pub fn local_peer_id(&self) -> PeerId {
        *self.swarm.local_peer_id()
    }

    pub fn listen_on(&mut self, addr: Multiaddr) -> Result<()> {
        self.swarm
            .listen_on(addr.clone())
            .map_err(|e| CosignError::NetworkError(format!("Failed to listen: {}", e)))?;

        info!("Listening on {}", addr);

        Ok(())
    }

    pub fn dial(&mut self, addr: Multiaddr) -> Result<()> {
        self.swarm
            .dial(addr.clone())
            .map_err(|e| CosignError::NetworkError(format!("Failed to dial: {}", e)))?;

        info!("Dialing {}", addr);

        Ok(())
    }

    /// Drives the swarm until every [`GossipHandle`] is dropped. The
    /// subscription reports `SubscriptionClosed` once this returns.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                event = self.swarm.select_next_some() => {
                    self.handle_swarm_event(event);
                }
                command = self.commands.recv() => match command {
                    Some(Command::Publish { data, reply }) => {
                        let result = self.publish(data);
                        let _ = reply.send(result);
                    }
                    None => {
                        info!("All gossip handles dropped, stopping P2P node");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Publishes to peers and delivers the same payload to the local
    /// subscription. Having no peers yet is not an error.
    fn publish(&mut self, data: Vec<u8>) -> Result<()> {
        match self
            .swarm
            .behaviour_mut()
            .gossipsub
            .publish(self.topic.clone(), data.clone())
        {
            Ok(message_id) => debug!("Published message {}", message_id),
            Err(PublishError::InsufficientPeers) => {
                debug!("No peers on topic yet, delivering locally only")
            }
            Err(PublishError::Duplicate) => debug!("Message already published"),
            Err(e) => {
                return Err(CosignError::NetworkError(format!(
                    "Failed to publish: {:?}",
                    e
                )))
            }
        }

        let local = Some(self.swarm.local_peer_id().to_string());
        if self.inbound.send(GossipMessage::new(local, data)).is_err() {
            warn!("Local subscription dropped, message not looped back");
        }

        Ok(())
    }

    fn handle_swarm_event(&mut self, event: SwarmEvent<CosignBehaviorEvent>) {
        match event {
            SwarmEvent::Behaviour(event) => self.handle_behavior_event(event),
            SwarmEvent::NewListenAddr { address, .. } => {
                info!("Listening on {}", address);
            }
            SwarmEvent::ConnectionEstablished {
                peer_id, endpoint, ..
            } => {
                info!(
                    "Connection established with peer: {} at {}",
                    peer_id,
                    endpoint.get_remote_address()
                );
            }
            SwarmEvent::ConnectionClosed { peer_id, cause, .. } => {
                info!("Connection closed with peer: {} cause: {:?}", peer_id, cause);
            }
            SwarmEvent::IncomingConnectionError { error, .. } => {
                warn!("Incoming connection error: {}", error);
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                warn!("Outgoing connection error to {:?}: {}", peer_id, error);
            }
            _ => {}
        }
    }

    fn handle_behavior_event(&mut self, event: CosignBehaviorEvent) {
        match event {
            CosignBehaviorEvent::Gossipsub(gossipsub::Event::Message {
                propagation_source,
                message,
                ..
            }) => {
                debug!(
                    "Received {} bytes via {} from {:?}",
                    message.data.len(),
                    propagation_source,
                    message.source
                );

                let source = message.source.map(|peer| peer.to_string());
                if self.inbound.send(GossipMessage::new(source, message.data)).is_err() {
                    warn!("Local subscription dropped, discarding gossip message");
                }
            }
            CosignBehaviorEvent::Gossipsub(gossipsub::Event::Subscribed { peer_id, topic }) => {
                info!("Peer {} subscribed to topic: {}", peer_id, topic);
            }
            CosignBehaviorEvent::Gossipsub(gossipsub::Event::Unsubscribed { peer_id, topic }) => {
                info!("Peer {} unsubscribed from topic: {}", peer_id, topic);
            }
            CosignBehaviorEvent::Gossipsub(_) => {}
            CosignBehaviorEvent::Mdns(mdns::Event::Discovered(peers)) => {
                for (peer_id, addr) in peers {
                    info!("mDNS discovered peer {} at {}", peer_id, addr);
                    self.swarm.behaviour_mut().gossipsub.add_explicit_peer(&peer_id);
                }
            }
            CosignBehaviorEvent::Mdns(mdns::Event::Expired(peers)) => {
                for (peer_id, _) in peers {
                    debug!("mDNS peer expired: {}", peer_id);
                    self.swarm
                        .behaviour_mut()
                        .gossipsub
                        .remove_explicit_peer(&peer_id);
                }
            }
            CosignBehaviorEvent::Identify(identify::Event::Received { peer_id, info, .. }) => {
                info!(
                    "Identified peer {}: protocol_version={}, agent_version={}",
                    peer_id, info.protocol_version, info.agent_version
                );
            }
            CosignBehaviorEvent::Identify(identify::Event::Error { peer_id, error, .. }) => {
                warn!("Identify error with peer {}: {}", peer_id, error);
            }
            CosignBehaviorEvent::Identify(_) => {}
            CosignBehaviorEvent::Ping(event) => match event.result {
                Ok(rtt) => debug!("Ping to {} took {:?}", event.peer, rtt),
                Err(e) => warn!("Ping failed to peer {}: {}", event.peer, e),
            },
        }
    }
}
