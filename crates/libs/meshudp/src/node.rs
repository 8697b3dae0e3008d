//! Node identity and process-wide configuration store.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use meshudp_proto::HardwareModel;

use crate::channel::ChannelSettings;
use crate::error::MeshError;

/// Node numbers the mesh reserves; none may be used as a sender
/// identity.
pub const RESERVED_NODE_IDS: [u32; 5] = [0x01, 0x02, 0x03, 0x04, 0xFFFF_FFFF];

/// A 32-bit node number, canonically rendered as `!` + 8 hex digits.
///
/// Construction rejects the reserved values, so holding a `NodeId`
/// guarantees it is usable as a sender identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(raw: u32) -> Result<Self, MeshError> {
        if RESERVED_NODE_IDS.contains(&raw) {
            return Err(MeshError::ReservedNodeId(raw));
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{:08x}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = MeshError;

    /// Accepts `!deadbeef` or bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('!').unwrap_or(s);
        let raw = u32::from_str_radix(hex, 16)
            .map_err(|_| MeshError::InvalidNodeId(s.to_string()))?;
        Self::new(raw)
    }
}

/// Everything the transport needs to know about the local node: who it
/// is and which channels it speaks.
///
/// The first channel is the one packets are sent on; the extras exist
/// so the receive path can try additional decryption keys.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub id: Option<NodeId>,
    pub long_name: String,
    pub short_name: String,
    pub hw_model: HardwareModel,
    pub public_key: Vec<u8>,
    pub channel: ChannelSettings,
    pub extra_channels: Vec<ChannelSettings>,
}

impl NodeConfig {
    /// A config speaking the given channel, identity still unset.
    pub fn new(channel: ChannelSettings) -> Self {
        Self {
            id: None,
            long_name: String::new(),
            short_name: String::new(),
            hw_model: HardwareModel::Unset,
            public_key: Vec::new(),
            channel,
            extra_channels: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_names(mut self, long_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        self.long_name = long_name.into();
        self.short_name = short_name.into();
        self
    }

    /// All channels, primary first. This is the key-try order on
    /// receive.
    pub fn channels(&self) -> Vec<ChannelSettings> {
        let mut all = Vec::with_capacity(1 + self.extra_channels.len());
        all.push(self.channel.clone());
        all.extend(self.extra_channels.iter().cloned());
        all
    }
}

/// Shared, read-mostly handle to the node configuration. Cloned into
/// the send and receive paths; writes happen during application setup.
#[derive(Clone)]
pub struct Node {
    inner: Arc<RwLock<NodeConfig>>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self { inner: Arc::new(RwLock::new(config)) }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> NodeConfig {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut NodeConfig)) {
        let mut config = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut config);
    }

    pub fn id(&self) -> Option<NodeId> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).id
    }

    /// All configured channels, primary first.
    pub fn channels(&self) -> Vec<ChannelSettings> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).channels()
    }
}
