//! Core packet schema: the routing envelope and the application payloads
//! carried inside it.
//!
//! Field numbers and scalar kinds come from `mesh.proto` in the public
//! Meshtastic protobufs and must not be changed.

use prost::{Enumeration, Message};

use crate::portnum::PortNum;

/// The network-level envelope. Carries routing/control metadata plus
/// exactly one payload variant: a decoded [`Data`] or opaque ciphertext.
///
/// `rx_time`, `rx_snr`, `rx_rssi`, `priority`, `relay_node`, and
/// `next_hop` are observed on receive only; senders leave them at their
/// defaults.
#[derive(Clone, PartialEq, Message)]
pub struct MeshPacket {
    /// Sending node number.
    #[prost(fixed32, tag = "1")]
    pub from: u32,
    /// Destination node number, or [`crate::BROADCAST_ADDR`].
    #[prost(fixed32, tag = "2")]
    pub to: u32,
    /// Channel hash byte; receivers use it to pick candidate keys.
    #[prost(uint32, tag = "3")]
    pub channel: u32,
    #[prost(oneof = "mesh_packet::PayloadVariant", tags = "4, 5")]
    pub payload_variant: Option<mesh_packet::PayloadVariant>,
    /// Unique (per sender, short-term) packet id.
    #[prost(fixed32, tag = "6")]
    pub id: u32,
    #[prost(fixed32, tag = "7")]
    pub rx_time: u32,
    #[prost(float, tag = "8")]
    pub rx_snr: f32,
    #[prost(uint32, tag = "9")]
    pub hop_limit: u32,
    #[prost(bool, tag = "10")]
    pub want_ack: bool,
    #[prost(enumeration = "mesh_packet::Priority", tag = "11")]
    pub priority: i32,
    #[prost(int32, tag = "12")]
    pub rx_rssi: i32,
    #[prost(uint32, tag = "15")]
    pub hop_start: u32,
    #[prost(uint32, tag = "18")]
    pub next_hop: u32,
    #[prost(uint32, tag = "19")]
    pub relay_node: u32,
}

impl MeshPacket {
    /// Borrow the decoded payload, if this packet carries one.
    pub fn decoded(&self) -> Option<&Data> {
        match &self.payload_variant {
            Some(mesh_packet::PayloadVariant::Decoded(data)) => Some(data),
            _ => None,
        }
    }

    /// Borrow the ciphertext, if this packet is still encrypted.
    pub fn encrypted(&self) -> Option<&[u8]> {
        match &self.payload_variant {
            Some(mesh_packet::PayloadVariant::Encrypted(bytes)) => Some(bytes.as_slice()),
            _ => None,
        }
    }
}

/// Nested message and enum types in `MeshPacket`.
pub mod mesh_packet {
    use prost::{Enumeration, Oneof};

    /// The payload union. A packet is either readable (`Decoded`) or
    /// opaque (`Encrypted`), never both.
    #[derive(Clone, PartialEq, Oneof)]
    pub enum PayloadVariant {
        #[prost(message, tag = "4")]
        Decoded(super::Data),
        #[prost(bytes = "vec", tag = "5")]
        Encrypted(Vec<u8>),
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
    #[repr(i32)]
    pub enum Priority {
        Unset = 0,
        Min = 1,
        Background = 10,
        Default = 64,
        Reliable = 70,
        Response = 80,
        High = 100,
        Alert = 110,
        Ack = 120,
        Max = 127,
    }
}

/// The application-level payload wrapped by [`MeshPacket`]: which
/// protocol the bytes belong to, and the bytes themselves.
#[derive(Clone, PartialEq, Message)]
pub struct Data {
    #[prost(enumeration = "PortNum", tag = "1")]
    pub portnum: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    #[prost(bool, tag = "3")]
    pub want_response: bool,
    #[prost(fixed32, tag = "4")]
    pub dest: u32,
    #[prost(fixed32, tag = "5")]
    pub source: u32,
    #[prost(fixed32, tag = "6")]
    pub request_id: u32,
    #[prost(fixed32, tag = "7")]
    pub reply_id: u32,
    #[prost(fixed32, tag = "8")]
    pub emoji: u32,
    #[prost(uint32, optional, tag = "9")]
    pub bitfield: Option<u32>,
}

/// Broadcast node-info record (NODEINFO_APP payload).
#[derive(Clone, PartialEq, Message)]
pub struct User {
    /// Canonical node id string, `!` + 8 hex digits.
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub long_name: String,
    #[prost(string, tag = "3")]
    pub short_name: String,
    #[prost(bytes = "vec", tag = "4")]
    pub macaddr: Vec<u8>,
    #[prost(enumeration = "HardwareModel", tag = "5")]
    pub hw_model: i32,
    #[prost(bool, tag = "6")]
    pub is_licensed: bool,
    #[prost(bytes = "vec", tag = "8")]
    pub public_key: Vec<u8>,
}

/// GPS report (POSITION_APP payload). Coordinates are degrees scaled by
/// 1e7 into signed integers.
#[derive(Clone, PartialEq, Message)]
pub struct Position {
    #[prost(sfixed32, optional, tag = "1")]
    pub latitude_i: Option<i32>,
    #[prost(sfixed32, optional, tag = "2")]
    pub longitude_i: Option<i32>,
    /// Meters above mean sea level.
    #[prost(int32, optional, tag = "3")]
    pub altitude: Option<i32>,
    #[prost(fixed32, tag = "4")]
    pub time: u32,
    #[prost(uint32, optional, tag = "15")]
    pub ground_speed: Option<u32>,
    #[prost(uint32, optional, tag = "16")]
    pub ground_track: Option<u32>,
    /// How many high bits of the coordinates are meaningful.
    #[prost(uint32, tag = "23")]
    pub precision_bits: u32,
}

/// Device hardware models this crate names; unknown values survive as
/// raw integers in [`User::hw_model`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum HardwareModel {
    Unset = 0,
    TloraV2 = 1,
    TloraV1 = 2,
    Tbeam = 4,
    TEcho = 7,
    Rak4631 = 9,
    HeltecV3 = 43,
    Portduino = 68,
    PrivateHw = 255,
}
