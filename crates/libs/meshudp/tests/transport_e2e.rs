//! End-to-end vectors: bytes built by the sender side fed through the
//! receive path, without touching a real socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use prost::Message;

use meshudp::{
    Bus, ChannelSettings, MeshError, Node, NodeConfig, PacketBuilder, PacketOptions, PacketStream,
    RxEvent, Topic,
};
use meshudp_proto::{MeshPacket, PortNum};

fn node(channel_name: &str, key: &str) -> Node {
    let channel = ChannelSettings::new(channel_name, key).expect("channel");
    Node::new(
        NodeConfig::new(channel)
            .with_id("!deadbeef".parse().expect("id"))
            .with_names("UDP Test", "UDP"),
    )
}

fn addr() -> SocketAddr {
    "192.168.1.77:4403".parse().expect("addr")
}

#[test]
fn text_message_wire_vector_roundtrips() {
    // Identity !deadbeef, channel "LongFast", key "AQ==".
    let node = node("LongFast", "AQ==");
    let builder = PacketBuilder::new(node.clone());
    let wire = builder
        .build(PortNum::TextMessageApp, b"hello world".to_vec(), &PacketOptions::default())
        .expect("build");

    let packet = MeshPacket::decode(wire.as_slice()).expect("parse");
    assert_eq!(packet.from, 0xdead_beef);
    assert!(packet.encrypted().is_some());

    let channel = ChannelSettings::new("LongFast", "AQ==").expect("channel");
    let data = meshudp::crypto::decrypt_packet(&packet, &channel).expect("decrypt");
    assert_eq!(data.portnum(), PortNum::TextMessageApp);
    assert_eq!(data.payload, b"hello world");
}

#[test]
fn built_packets_flow_through_the_stream() {
    let node = node("LongFast", "AQ==");
    let stream = PacketStream::new(
        "224.0.0.69".parse().expect("group"),
        4403,
        node.clone(),
        Bus::new(),
    );

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    stream.bus().subscribe(Topic::Port(PortNum::TextMessageApp as i32), move |event| {
        if let RxEvent::Packet { packet, addr } = event {
            let data = packet.decoded().expect("decoded");
            sink.lock().expect("lock").push((
                packet.from,
                String::from_utf8_lossy(&data.payload).into_owned(),
                *addr,
            ));
        }
    });

    let builder = PacketBuilder::new(node.clone());
    let wire = builder
        .build(PortNum::TextMessageApp, b"hello world".to_vec(), &PacketOptions::default())
        .expect("build");
    stream.handle_datagram(&wire, addr());

    let received = received.lock().expect("lock");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, 0xdead_beef);
    assert_eq!(received[0].1, "hello world");
    assert_eq!(received[0].2, addr());
}

#[test]
fn corrupt_bytes_then_valid_packet() {
    let node = node("LongFast", "AQ==");
    let stream = PacketStream::new(
        "224.0.0.69".parse().expect("group"),
        4403,
        node.clone(),
        Bus::new(),
    );

    let errors = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&errors);
    stream.bus().subscribe(Topic::DecodeError, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(&delivered);
    stream.bus().subscribe(Topic::Packet, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Truncate a valid packet mid-field.
    let builder = PacketBuilder::new(node.clone());
    let wire = builder
        .build(PortNum::TextMessageApp, b"payload".to_vec(), &PacketOptions::default())
        .expect("build");
    stream.handle_datagram(&wire[..wire.len() / 2], addr());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(delivered.load(Ordering::SeqCst), 0);

    // The loop body still processes the next, valid datagram.
    stream.handle_datagram(&wire, addr());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[test]
fn plaintext_channel_skips_encryption_end_to_end() {
    let node = node("LongFast", "");
    let builder = PacketBuilder::new(node.clone());
    let wire = builder
        .build(PortNum::TextMessageApp, b"in the clear".to_vec(), &PacketOptions::default())
        .expect("build");

    let packet = MeshPacket::decode(wire.as_slice()).expect("parse");
    let data = packet.decoded().expect("decoded variant on the wire");
    assert_eq!(data.payload, b"in the clear");
    assert!(packet.encrypted().is_none());
}

#[test]
fn reserved_identity_is_rejected_at_configuration() {
    for reserved in ["!00000001", "!00000004", "!ffffffff"] {
        let err = reserved.parse::<meshudp::NodeId>().expect_err("reserved id must fail");
        assert!(matches!(err, MeshError::ReservedNodeId(_)));
    }
}

#[test]
fn consecutive_sends_carry_distinct_ids() {
    let node = node("LongFast", "AQ==");
    let builder = PacketBuilder::new(node.clone());
    let options = PacketOptions::default();
    let first = builder
        .build(PortNum::TextMessageApp, b"one".to_vec(), &options)
        .expect("build");
    let second = builder
        .build(PortNum::TextMessageApp, b"two".to_vec(), &options)
        .expect("build");

    let first = MeshPacket::decode(first.as_slice()).expect("parse");
    let second = MeshPacket::decode(second.as_slice()).expect("parse");
    assert_ne!(first.id, second.id);
    // The low-order counter steps by exactly one between sends.
    assert_eq!(second.id & 0x3FF, (first.id.wrapping_add(1)) & 0x3FF);
}
