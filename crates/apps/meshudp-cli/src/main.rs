//! Command-line Meshtastic UDP node.
//!
//! `meshudp listen` joins the multicast group and prints what it hears;
//! the `send-*` subcommands broadcast one packet and exit.

mod config;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use prost::Message;

use meshudp::{
    Bus, ChannelSettings, MeshSender, MulticastSocket, Node, NodeConfig, PacketStream,
    PositionReport, RxEvent, Topic,
};
use meshudp_proto::{DeviceMetrics, PortNum, User};

use config::FileConfig;

#[derive(Parser, Debug)]
#[command(name = "meshudp", about = "Meshtastic node on IP multicast UDP")]
struct Args {
    /// Multicast group to join.
    #[arg(long, default_value = "224.0.0.69")]
    group: Ipv4Addr,
    #[arg(long, default_value_t = 4403)]
    port: u16,
    /// TOML file with node identity and channels.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Node id, `!` + 8 hex digits. Overrides the config file.
    #[arg(long)]
    node_id: Option<String>,
    #[arg(long)]
    long_name: Option<String>,
    #[arg(long)]
    short_name: Option<String>,
    /// Channel name. Overrides the config file's first channel.
    #[arg(long)]
    channel: Option<String>,
    /// Channel key, base64. An empty string disables encryption.
    #[arg(long)]
    key: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print received packets until interrupted.
    Listen {
        /// Also hex-dump every raw datagram.
        #[arg(long)]
        raw: bool,
    },
    /// Send a UTF-8 text message.
    SendText { message: String },
    /// Broadcast this node's user record.
    SendNodeinfo,
    /// Broadcast a position report.
    SendPosition {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        #[arg(long)]
        alt: Option<i32>,
        #[arg(long, default_value_t = 32)]
        precision_bits: u32,
    },
    /// Broadcast device telemetry.
    SendTelemetry {
        #[arg(long)]
        battery_level: Option<u32>,
        #[arg(long)]
        voltage: Option<f32>,
        #[arg(long)]
        uptime_seconds: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let node = build_node(&args)?;

    match &args.command {
        Command::Listen { raw } => listen(&args, node, *raw).await,
        Command::SendText { message } => {
            sender(&args, node)?.send_text(message).await?;
            Ok(())
        }
        Command::SendNodeinfo => {
            sender(&args, node)?.send_nodeinfo().await?;
            Ok(())
        }
        Command::SendPosition { lat, lon, alt, precision_bits } => {
            sender(&args, node)?
                .send_position(PositionReport {
                    latitude: *lat,
                    longitude: *lon,
                    altitude: *alt,
                    precision_bits: *precision_bits,
                    ..Default::default()
                })
                .await?;
            Ok(())
        }
        Command::SendTelemetry { battery_level, voltage, uptime_seconds } => {
            sender(&args, node)?
                .send_device_telemetry(DeviceMetrics {
                    battery_level: *battery_level,
                    voltage: *voltage,
                    uptime_seconds: *uptime_seconds,
                    ..Default::default()
                })
                .await?;
            Ok(())
        }
    }
}

fn sender(args: &Args, node: Node) -> anyhow::Result<MeshSender> {
    let socket = Arc::new(MulticastSocket::bind(args.group, args.port)?);
    Ok(MeshSender::new(node, socket))
}

/// Merge config file and flags into the shared node store. Flags win.
fn build_node(args: &Args) -> anyhow::Result<Node> {
    let file = match &args.config {
        Some(path) => FileConfig::from_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => FileConfig::default(),
    };

    let channel_name = args
        .channel
        .clone()
        .or_else(|| file.channels.first().map(|channel| channel.name.clone()))
        .unwrap_or_else(|| "LongFast".to_string());
    let key = args
        .key
        .clone()
        .or_else(|| file.channels.first().map(|channel| channel.key.clone()))
        .unwrap_or_else(|| "AQ==".to_string());

    let mut node_config = NodeConfig::new(ChannelSettings::new(channel_name, &key)?);
    for extra in file.channels.iter().skip(1) {
        node_config
            .extra_channels
            .push(ChannelSettings::new(extra.name.clone(), &extra.key)?);
    }
    if let Some(id) = args.node_id.as_ref().or(file.node.id.as_ref()) {
        node_config.id = Some(id.parse()?);
    }
    if let Some(name) = args.long_name.clone().or_else(|| file.node.long_name.clone()) {
        node_config.long_name = name;
    }
    if let Some(name) = args.short_name.clone().or_else(|| file.node.short_name.clone()) {
        node_config.short_name = name;
    }
    Ok(Node::new(node_config))
}

async fn listen(args: &Args, node: Node, raw: bool) -> anyhow::Result<()> {
    let bus = Bus::new();

    if raw {
        bus.subscribe(Topic::Raw, |event| {
            if let RxEvent::Raw { bytes, addr } = event {
                println!("[raw] {} bytes from {addr}: {}", bytes.len(), hex::encode(bytes));
            }
        });
    }
    bus.subscribe(Topic::Packet, |event| {
        if let RxEvent::Packet { packet, addr } = event {
            match packet.decoded() {
                Some(data) => println!(
                    "[rx] id={:#010x} from={:#010x} to={:#010x} port={} ({addr})",
                    packet.id, packet.from, packet.to, data.portnum
                ),
                None => println!(
                    "[rx] id={:#010x} from={:#010x} still encrypted ({addr})",
                    packet.id, packet.from
                ),
            }
        }
    });
    bus.subscribe(Topic::Port(PortNum::TextMessageApp as i32), |event| {
        if let RxEvent::Packet { packet, .. } = event {
            if let Some(data) = packet.decoded() {
                println!(
                    "[text] {:#010x}: {}",
                    packet.from,
                    String::from_utf8_lossy(&data.payload)
                );
            }
        }
    });
    bus.subscribe(Topic::Port(PortNum::NodeinfoApp as i32), |event| {
        if let RxEvent::Packet { packet, .. } = event {
            if let Some(data) = packet.decoded() {
                match User::decode(data.payload.as_slice()) {
                    Ok(user) => println!(
                        "[nodeinfo] {} '{}' ({}) hw={:?}",
                        user.id,
                        user.long_name,
                        user.short_name,
                        user.hw_model()
                    ),
                    Err(err) => println!("[nodeinfo] unparseable user record: {err}"),
                }
            }
        }
    });
    bus.subscribe(Topic::DecodeError, |event| {
        if let RxEvent::DecodeError { bytes, addr, error } = event {
            println!("[decode_error] {} bytes from {addr}: {error}", bytes.len());
        }
    });
    bus.subscribe(Topic::DecryptError, |event| {
        if let RxEvent::DecryptError { packet, addr } = event {
            println!(
                "[decrypt_error] id={:#010x} from={:#010x} ({addr})",
                packet.id, packet.from
            );
        }
    });

    let mut stream = PacketStream::new(args.group, args.port, node, bus);
    stream.start()?;
    println!("listening on {}:{} (ctrl-c to stop)", args.group, args.port);
    tokio::signal::ctrl_c().await?;
    stream.stop().await;
    Ok(())
}
