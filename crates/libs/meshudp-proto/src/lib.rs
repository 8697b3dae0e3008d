//! # meshudp-proto
//!
//! Meshtastic protobuf wire types used by the meshudp transport.
//!
//! These structs mirror the public `meshtastic/protobufs` schema: field
//! names, numbers, and scalar kinds must stay byte-compatible with the
//! packets the live mesh exchanges. They are maintained by hand with
//! prost derive macros rather than generated at build time, and cover
//! the subset of the schema this transport produces and consumes:
//!
//! ```text
//! MeshPacket (routing envelope, plaintext or encrypted payload)
//!   └── Data (portnum + application payload bytes)
//!         ├── User       (node info)
//!         ├── Position   (GPS report)
//!         └── Telemetry  (device/environment/power metrics)
//! ```
//!
//! Unknown fields on the wire are skipped by prost, so peers running a
//! newer schema stay decodable.

pub mod mesh;
pub mod portnum;
pub mod telemetry;

pub use mesh::{mesh_packet, Data, HardwareModel, MeshPacket, Position, User};
pub use portnum::PortNum;
pub use telemetry::telemetry::Variant as TelemetryVariant;
pub use telemetry::{DeviceMetrics, EnvironmentMetrics, PowerMetrics, Telemetry};

/// Destination address for broadcast packets.
pub const BROADCAST_ADDR: u32 = 0xFFFF_FFFF;
