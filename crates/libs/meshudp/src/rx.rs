//! Inbound receive loop: parse, opportunistically decrypt, fan out.

use std::net::{Ipv4Addr, SocketAddr};

use prost::Message;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use meshudp_proto::mesh_packet::PayloadVariant;
use meshudp_proto::{Data, MeshPacket};

use crate::bus::{Bus, RxEvent, Topic};
use crate::crypto;
use crate::error::MeshError;
use crate::node::Node;
use crate::socket::MulticastSocket;

const MAX_DATAGRAM: usize = 65_535;

/// Owns the receiving side: a cancellable loop on its own tokio task
/// that turns datagrams into bus events.
///
/// Lifecycle is `Stopped -> Running -> Stopped`: [`start`](Self::start)
/// binds the socket, joins the group, and spawns the loop;
/// [`stop`](Self::stop) cancels it and waits for the task to release
/// the socket. Starting while running is an error; stopping while
/// stopped is a no-op.
pub struct PacketStream {
    group: Ipv4Addr,
    port: u16,
    node: Node,
    bus: Bus,
    running: Option<RunningLoop>,
}

struct RunningLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PacketStream {
    pub fn new(group: Ipv4Addr, port: u16, node: Node, bus: Bus) -> Self {
        Self { group, port, node, bus, running: None }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn start(&mut self) -> Result<(), MeshError> {
        if self.running.is_some() {
            return Err(MeshError::AlreadyRunning);
        }
        let socket = MulticastSocket::bind(self.group, self.port)?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            socket,
            self.node.clone(),
            self.bus.clone(),
            cancel.clone(),
        ));
        self.running = Some(RunningLoop { cancel, task });
        log::info!("packet stream listening on {}:{}", self.group, self.port);
        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            if running.task.await.is_err() {
                log::warn!("receive task ended abnormally");
            }
            log::info!("packet stream stopped");
        }
    }

    /// The loop body for one datagram, callable directly so alternate
    /// transports (or tests) can inject bytes into the parse step.
    pub fn handle_datagram(&self, bytes: &[u8], addr: SocketAddr) {
        handle_datagram(&self.node, &self.bus, bytes, addr);
    }
}

async fn receive_loop(socket: MulticastSocket, node: Node, bus: Bus, cancel: CancellationToken) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, addr)) => handle_datagram(&node, &bus, &buf[..len], addr),
                // Transient by the UDP contract; the loop never dies on
                // a receive error.
                Err(err) => log::warn!("receive error: {err}"),
            },
        }
    }
}

fn handle_datagram(node: &Node, bus: &Bus, bytes: &[u8], addr: SocketAddr) {
    bus.publish(Topic::Raw, &RxEvent::Raw { bytes: bytes.to_vec(), addr });

    let mut packet = match MeshPacket::decode(bytes) {
        Ok(packet) => packet,
        Err(err) => {
            log::debug!("undecodable datagram from {addr}: {err}");
            bus.publish(
                Topic::DecodeError,
                &RxEvent::DecodeError { bytes: bytes.to_vec(), addr, error: err.to_string() },
            );
            return;
        }
    };

    if matches!(packet.payload_variant, Some(PayloadVariant::Encrypted(_))) {
        match decrypt_with_any_key(node, &packet) {
            Some(data) => packet.payload_variant = Some(PayloadVariant::Decoded(data)),
            None => {
                log::debug!(
                    "no configured key decrypts packet {:#010x} from {:#010x}",
                    packet.id,
                    packet.from
                );
                bus.publish(
                    Topic::DecryptError,
                    &RxEvent::DecryptError { packet: packet.clone(), addr },
                );
            }
        }
    }

    let port = packet.decoded().map(|data| data.portnum);
    match port {
        Some(port) => {
            bus.publish(Topic::Packet, &RxEvent::Packet { packet: packet.clone(), addr });
            bus.publish(Topic::Port(port), &RxEvent::Packet { packet, addr });
        }
        // Still-encrypted packets reach the catch-all so observers see
        // the routing metadata.
        None => bus.publish(Topic::Packet, &RxEvent::Packet { packet, addr }),
    }
}

/// Try every configured channel key, first structural success wins.
/// The stamped channel byte is only a hint; hash collisions mean it
/// cannot be trusted as a unique key selector.
fn decrypt_with_any_key(node: &Node, packet: &MeshPacket) -> Option<Data> {
    for channel in node.channels() {
        if channel.is_plaintext() {
            continue;
        }
        if let Ok(data) = crypto::try_decrypt(packet, &channel) {
            if u32::from(channel.hash()) != packet.channel {
                log::debug!(
                    "channel '{}' decrypted packet stamped {:#04x} (hash collision)",
                    channel.name,
                    packet.channel
                );
            }
            return Some(data);
        }
    }
    None
}
