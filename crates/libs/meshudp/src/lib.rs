//! # meshudp
//!
//! Bidirectional Meshtastic transport over IP multicast UDP.
//!
//! Outbound, [`PacketBuilder`] wraps an application payload in the
//! mesh packet envelope (stamping the sender id, a fresh message id,
//! and the channel hash) and encrypts it when the active channel has a
//! key. [`MeshSender`] adds the socket plus typed senders for text,
//! node-info, position, and telemetry. Inbound, [`PacketStream`] runs a
//! cancellable receive loop that parses each datagram, tries every
//! configured channel key on encrypted payloads, and fans the result
//! out on a [`Bus`] under stable topics (`mesh.rx.packet`,
//! `mesh.rx.port.<n>`, error topics).
//!
//! The transport is fire-and-forget: no acks, no routing, no
//! retransmission.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use meshudp::{Bus, ChannelSettings, MeshSender, MulticastSocket, Node, NodeConfig};
//!
//! # async fn run() -> Result<(), meshudp::MeshError> {
//! let channel = ChannelSettings::new("LongFast", "AQ==")?;
//! let node = Node::new(
//!     NodeConfig::new(channel)
//!         .with_id("!deadbeef".parse()?)
//!         .with_names("UDP Test", "UDP"),
//! );
//! let socket = Arc::new(MulticastSocket::bind("224.0.0.69".parse().unwrap(), 4403)?);
//! let sender = MeshSender::new(node, socket);
//! sender.send_text("hello world").await?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod channel;
pub mod crypto;
pub mod error;
pub mod msgid;
pub mod node;
pub mod rx;
pub mod socket;
pub mod tx;

pub use bus::{Bus, RxEvent, SubscriptionId, Topic};
pub use channel::{channel_hash, xor_hash, ChannelKey, ChannelSettings, DEFAULT_PSK};
pub use error::MeshError;
pub use msgid::MessageIdGenerator;
pub use node::{Node, NodeConfig, NodeId, RESERVED_NODE_IDS};
pub use rx::PacketStream;
pub use socket::MulticastSocket;
pub use tx::{MeshSender, PacketBuilder, PacketOptions, PositionReport, DEFAULT_HOP_LIMIT};
