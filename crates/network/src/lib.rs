pub mod behavior;
pub mod messages;
pub mod node;

pub use behavior::{CosignBehavior, DEFAULT_TOPIC};
pub use messages::{GossipMessage, Subscription};
pub use node::{GossipHandle, GossipPublisher, P2PNode};

pub use libp2p::{identity::Keypair, Multiaddr};
