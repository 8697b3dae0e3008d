use std::io;

/// Errors from transport operations.
///
/// Send-path errors surface synchronously to the caller and are never
/// retried here. Receive-path errors are published on the bus and never
/// terminate the receive loop.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// The node number is one of the values the mesh reserves.
    #[error("node id {0:#010x} is reserved and cannot be used")]
    ReservedNodeId(u32),

    #[error("invalid node id '{0}' (expected '!' + 8 hex digits)")]
    InvalidNodeId(String),

    #[error("invalid channel key: {0}")]
    InvalidChannelKey(String),

    /// Malformed wire bytes.
    #[error("wire decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Key mismatch, missing key material, or structurally invalid
    /// plaintext after decryption.
    #[error("decrypt failed: {0}")]
    Decrypt(&'static str),

    #[error("packet stream is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Io(#[from] io::Error),
}
