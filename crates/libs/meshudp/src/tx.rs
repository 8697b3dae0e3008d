//! Outbound packet construction and the typed convenience senders.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;

use meshudp_proto::mesh_packet::PayloadVariant;
use meshudp_proto::{
    Data, DeviceMetrics, EnvironmentMetrics, HardwareModel, MeshPacket, PortNum, Position,
    PowerMetrics, Telemetry, TelemetryVariant, User, BROADCAST_ADDR,
};

use crate::crypto;
use crate::error::MeshError;
use crate::msgid::MessageIdGenerator;
use crate::node::Node;
use crate::socket::MulticastSocket;

/// Default hop budget for outbound packets.
pub const DEFAULT_HOP_LIMIT: u32 = 3;

/// Per-packet overrides. `Default` gives a broadcast packet with the
/// standard hop budget and no ack request.
#[derive(Clone, Debug, Default)]
pub struct PacketOptions {
    /// Destination node number; broadcast when unset.
    pub to: Option<u32>,
    pub want_ack: bool,
    pub hop_limit: Option<u32>,
    pub hop_start: Option<u32>,
    pub want_response: bool,
    /// Inner payload flags; defaults to 1 on the wire.
    pub bitfield: Option<u32>,
}

/// Assembles and serializes outbound packets.
///
/// Reads the sender identity and active channel from the shared
/// [`Node`] store, draws ids from a shared [`MessageIdGenerator`], and
/// chooses encrypted vs. plaintext encoding from the channel key.
/// `build` takes `&self`, so concurrent callers are fine.
pub struct PacketBuilder {
    node: Node,
    ids: Arc<MessageIdGenerator>,
}

impl PacketBuilder {
    pub fn new(node: Node) -> Self {
        Self::with_ids(node, Arc::new(MessageIdGenerator::new()))
    }

    /// Share an id generator with other builders in the process.
    pub fn with_ids(node: Node, ids: Arc<MessageIdGenerator>) -> Self {
        Self { node, ids }
    }

    /// Build and serialize a packet carrying `payload` on `portnum`.
    /// Advances the shared message-id counter.
    pub fn build(
        &self,
        portnum: PortNum,
        payload: Vec<u8>,
        options: &PacketOptions,
    ) -> Result<Vec<u8>, MeshError> {
        Ok(self.build_packet(portnum, payload, options)?.encode_to_vec())
    }

    /// Like [`build`](Self::build), returning the structured packet
    /// before serialization.
    pub fn build_packet(
        &self,
        portnum: PortNum,
        payload: Vec<u8>,
        options: &PacketOptions,
    ) -> Result<MeshPacket, MeshError> {
        let config = self.node.config();
        let from = config
            .id
            .ok_or_else(|| MeshError::InvalidNodeId("node id not configured".to_string()))?;
        let channel = config.channel;
        let id = self.ids.next_id();

        let data = Data {
            portnum: portnum as i32,
            payload,
            want_response: options.want_response,
            bitfield: Some(options.bitfield.unwrap_or(1)),
            ..Default::default()
        };

        let mut packet = MeshPacket {
            id,
            from: from.get(),
            to: options.to.unwrap_or(BROADCAST_ADDR),
            want_ack: options.want_ack,
            channel: u32::from(channel.hash()),
            hop_limit: options.hop_limit.unwrap_or(DEFAULT_HOP_LIMIT),
            hop_start: options.hop_start.unwrap_or(DEFAULT_HOP_LIMIT),
            ..Default::default()
        };
        packet.payload_variant = if channel.is_plaintext() {
            Some(PayloadVariant::Decoded(data))
        } else {
            let ciphertext = crypto::encrypt_payload(&channel, id, packet.from, &data)?;
            Some(PayloadVariant::Encrypted(ciphertext))
        };
        Ok(packet)
    }
}

/// A position fix in application units; scaled onto the wire by
/// [`MeshSender::send_position`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PositionReport {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<i32>,
    pub precision_bits: u32,
    pub ground_speed: Option<u32>,
    pub ground_track: Option<u32>,
}

/// Builder plus socket: the application-facing send API.
pub struct MeshSender {
    node: Node,
    builder: PacketBuilder,
    socket: Arc<MulticastSocket>,
}

impl MeshSender {
    pub fn new(node: Node, socket: Arc<MulticastSocket>) -> Self {
        let builder = PacketBuilder::new(node.clone());
        Self { node, builder, socket }
    }

    pub fn builder(&self) -> &PacketBuilder {
        &self.builder
    }

    /// Build a packet and emit it to the group. Returns the number of
    /// bytes sent. Fails synchronously; never retries.
    pub async fn send(
        &self,
        portnum: PortNum,
        payload: Vec<u8>,
        options: &PacketOptions,
    ) -> Result<usize, MeshError> {
        let bytes = self.builder.build(portnum, payload, options)?;
        let sent = self.socket.send(&bytes).await?;
        log::info!(
            "tx {portnum:?} -> {:#010x} ({sent} bytes)",
            options.to.unwrap_or(BROADCAST_ADDR)
        );
        Ok(sent)
    }

    /// Broadcast a UTF-8 text message.
    pub async fn send_text(&self, message: &str) -> Result<usize, MeshError> {
        self.send(
            PortNum::TextMessageApp,
            message.as_bytes().to_vec(),
            &PacketOptions::default(),
        )
        .await
    }

    /// Broadcast this node's user record (names, id, hardware model).
    pub async fn send_nodeinfo(&self) -> Result<usize, MeshError> {
        let config = self.node.config();
        let id = config
            .id
            .ok_or_else(|| MeshError::InvalidNodeId("node id not configured".to_string()))?;
        let hw_model = match config.hw_model {
            HardwareModel::Unset => HardwareModel::PrivateHw,
            model => model,
        };
        let user = User {
            id: id.to_string(),
            long_name: config.long_name,
            short_name: config.short_name,
            hw_model: hw_model as i32,
            public_key: config.public_key,
            ..Default::default()
        };
        self.send(
            PortNum::NodeinfoApp,
            user.encode_to_vec(),
            &PacketOptions::default(),
        )
        .await
    }

    /// Broadcast a position report. Coordinates are scaled to the
    /// wire's 1e-7 degree integers.
    pub async fn send_position(&self, report: PositionReport) -> Result<usize, MeshError> {
        let position = Position {
            latitude_i: Some((report.latitude * 1e7) as i32),
            longitude_i: Some((report.longitude * 1e7) as i32),
            altitude: report.altitude,
            time: epoch_seconds(),
            ground_speed: report.ground_speed,
            ground_track: report.ground_track,
            precision_bits: report.precision_bits,
        };
        self.send(
            PortNum::PositionApp,
            position.encode_to_vec(),
            &PacketOptions::default(),
        )
        .await
    }

    /// Broadcast device telemetry (battery, radio utilization, uptime).
    pub async fn send_device_telemetry(&self, metrics: DeviceMetrics) -> Result<usize, MeshError> {
        self.send_telemetry(TelemetryVariant::DeviceMetrics(metrics)).await
    }

    /// Broadcast environment sensor readings.
    pub async fn send_environment_metrics(
        &self,
        metrics: EnvironmentMetrics,
    ) -> Result<usize, MeshError> {
        self.send_telemetry(TelemetryVariant::EnvironmentMetrics(metrics)).await
    }

    /// Broadcast power-channel measurements.
    pub async fn send_power_metrics(&self, metrics: PowerMetrics) -> Result<usize, MeshError> {
        self.send_telemetry(TelemetryVariant::PowerMetrics(metrics)).await
    }

    async fn send_telemetry(&self, variant: TelemetryVariant) -> Result<usize, MeshError> {
        let telemetry = Telemetry { time: epoch_seconds(), variant: Some(variant) };
        self.send(
            PortNum::TelemetryApp,
            telemetry.encode_to_vec(),
            &PacketOptions::default(),
        )
        .await
    }
}

fn epoch_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelSettings;
    use crate::node::NodeConfig;
    use prost::Message;

    fn node(key: &str) -> Node {
        let channel = ChannelSettings::new("LongFast", key).expect("channel");
        let config = NodeConfig::new(channel)
            .with_id("!deadbeef".parse().expect("id"))
            .with_names("UDP Test", "UDP");
        Node::new(config)
    }

    #[test]
    fn build_stamps_sender_identity() {
        let builder = PacketBuilder::new(node("AQ=="));
        let bytes = builder
            .build(PortNum::TextMessageApp, b"hi".to_vec(), &PacketOptions::default())
            .expect("build");
        let packet = MeshPacket::decode(bytes.as_slice()).expect("decode");
        assert_eq!(packet.from, 0xdead_beef);
        assert_eq!(packet.to, BROADCAST_ADDR);
        assert_eq!(packet.hop_limit, DEFAULT_HOP_LIMIT);
        assert_eq!(packet.hop_start, DEFAULT_HOP_LIMIT);
        assert_eq!(packet.channel, 0x08);
    }

    #[test]
    fn unconfigured_identity_fails_the_send() {
        let channel = ChannelSettings::new("LongFast", "AQ==").expect("channel");
        let builder = PacketBuilder::new(Node::new(NodeConfig::new(channel)));
        let result =
            builder.build(PortNum::TextMessageApp, Vec::new(), &PacketOptions::default());
        assert!(matches!(result, Err(MeshError::InvalidNodeId(_))));
    }

    #[test]
    fn keyed_channel_produces_encrypted_variant() {
        let builder = PacketBuilder::new(node("AQ=="));
        let packet = builder
            .build_packet(PortNum::TextMessageApp, b"secret".to_vec(), &PacketOptions::default())
            .expect("build");
        assert!(packet.encrypted().is_some());
        assert!(packet.decoded().is_none());
    }

    #[test]
    fn empty_key_produces_decoded_variant() {
        let builder = PacketBuilder::new(node(""));
        let packet = builder
            .build_packet(PortNum::TextMessageApp, b"open".to_vec(), &PacketOptions::default())
            .expect("build");
        let data = packet.decoded().expect("decoded variant");
        assert_eq!(data.payload, b"open");
        assert_eq!(data.bitfield, Some(1));
        assert!(packet.encrypted().is_none());
    }

    #[test]
    fn back_to_back_builds_get_distinct_ids() {
        let builder = PacketBuilder::new(node("AQ=="));
        let first = builder
            .build_packet(PortNum::TextMessageApp, b"a".to_vec(), &PacketOptions::default())
            .expect("build");
        let second = builder
            .build_packet(PortNum::TextMessageApp, b"b".to_vec(), &PacketOptions::default())
            .expect("build");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn options_override_defaults() {
        let builder = PacketBuilder::new(node("AQ=="));
        let options = PacketOptions {
            to: Some(0x0123_4567),
            want_ack: true,
            hop_limit: Some(7),
            hop_start: Some(7),
            want_response: true,
            bitfield: Some(3),
        };
        let packet = builder
            .build_packet(PortNum::TextMessageApp, Vec::new(), &options)
            .expect("build");
        assert_eq!(packet.to, 0x0123_4567);
        assert!(packet.want_ack);
        assert_eq!(packet.hop_limit, 7);
        // Inner fields travel encrypted; decrypt to check them.
        let channel = ChannelSettings::new("LongFast", "AQ==").expect("channel");
        let data = crate::crypto::decrypt_packet(&packet, &channel).expect("decrypt");
        assert!(data.want_response);
        assert_eq!(data.bitfield, Some(3));
    }
}
