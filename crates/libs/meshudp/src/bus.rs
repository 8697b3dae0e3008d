//! Topic-based fan-out for received packets.
//!
//! The topic keys are a stable external contract; their dotted names
//! (`mesh.rx.packet`, `mesh.rx.port.<n>`, ...) are what subscriber code
//! keys on and must not change.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use meshudp_proto::MeshPacket;

/// Where a received event is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every datagram, before parsing (`mesh.rx.raw`).
    Raw,
    /// Every parsed packet, decoded or still encrypted
    /// (`mesh.rx.packet`).
    Packet,
    /// Decoded packets for one application port
    /// (`mesh.rx.port.<n>`).
    Port(i32),
    /// Datagrams that failed to parse (`mesh.rx.decode_error`).
    DecodeError,
    /// Packets no configured key could decrypt
    /// (`mesh.rx.decrypt_error`).
    DecryptError,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Raw => write!(f, "mesh.rx.raw"),
            Topic::Packet => write!(f, "mesh.rx.packet"),
            Topic::Port(port) => write!(f, "mesh.rx.port.{port}"),
            Topic::DecodeError => write!(f, "mesh.rx.decode_error"),
            Topic::DecryptError => write!(f, "mesh.rx.decrypt_error"),
        }
    }
}

/// What subscribers receive.
#[derive(Clone, Debug)]
pub enum RxEvent {
    Raw { bytes: Vec<u8>, addr: SocketAddr },
    Packet { packet: MeshPacket, addr: SocketAddr },
    DecodeError { bytes: Vec<u8>, addr: SocketAddr, error: String },
    /// The packet is delivered with its ciphertext intact so observers
    /// still see the routing metadata.
    DecryptError { packet: MeshPacket, addr: SocketAddr },
}

type Handler = Arc<dyn Fn(&RxEvent) + Send + Sync>;

/// Handle returned by [`Bus::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    topics: Mutex<HashMap<Topic, Vec<(SubscriptionId, Handler)>>>,
}

/// Registry mapping topics to ordered subscriber lists.
///
/// Dispatch is synchronous on the publishing task. Each subscriber runs
/// isolated: a panic is caught and logged, and delivery continues to
/// the remaining subscribers.
#[derive(Clone, Default)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&RxEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut topics = self.inner.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.entry(topic).or_default().push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut topics = self.inner.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        for handlers in topics.values_mut() {
            let before = handlers.len();
            handlers.retain(|(sub_id, _)| *sub_id != id);
            removed |= handlers.len() != before;
        }
        removed
    }

    /// Deliver an event to every subscriber of `topic`, in subscription
    /// order.
    pub fn publish(&self, topic: Topic, event: &RxEvent) {
        // Clone the handler list out of the lock so subscribers may
        // themselves subscribe/unsubscribe without deadlocking.
        let handlers: Vec<(SubscriptionId, Handler)> = {
            let topics = self.inner.topics.lock().unwrap_or_else(PoisonError::into_inner);
            match topics.get(&topic) {
                Some(handlers) => handlers.clone(),
                None => return,
            }
        };
        for (id, handler) in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                log::warn!("subscriber {id:?} on {topic} panicked, continuing");
            }
        }
    }
}
