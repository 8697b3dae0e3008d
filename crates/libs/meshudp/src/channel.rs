//! Channel identity: the name + key pair that scopes a broadcast
//! domain, and the one-byte hash that stamps it onto the wire.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::MeshError;

/// The well-known PSK every stock node ships with. One-byte keys expand
/// into a variant of this (see [`ChannelKey::cipher_bytes`]).
pub const DEFAULT_PSK: [u8; 16] = [
    0xd4, 0xf1, 0xbb, 0x3a, 0x20, 0x29, 0x07, 0x59, 0xf0, 0xbc, 0xff, 0xab, 0xcf, 0x4e, 0x69,
    0x01,
];

/// Symmetric key material for one channel, as configured.
///
/// The wire semantics follow the live network:
/// - empty key: the channel is plaintext, nothing is encrypted
/// - a single byte `n` in `1..=10`: shorthand for the default PSK with
///   its last byte advanced by `n - 1`
/// - 16 or 32 bytes: an AES-128 / AES-256 key used as given
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelKey {
    None,
    Default(u8),
    Aes128([u8; 16]),
    Aes256([u8; 32]),
}

impl ChannelKey {
    /// Parse a base64 key string. The URL-safe alphabet is accepted by
    /// translating `-`/`_` before decoding. A one-byte `0` key also
    /// means "no encryption".
    pub fn from_base64(encoded: &str) -> Result<Self, MeshError> {
        if encoded.is_empty() {
            return Ok(Self::None);
        }
        let normalized = encoded.replace('-', "+").replace('_', "/");
        let raw = BASE64
            .decode(normalized)
            .map_err(|err| MeshError::InvalidChannelKey(err.to_string()))?;
        match raw.len() {
            0 => Ok(Self::None),
            1 if raw[0] == 0 => Ok(Self::None),
            1 if (1..=10).contains(&raw[0]) => Ok(Self::Default(raw[0])),
            1 => Err(MeshError::InvalidChannelKey(format!(
                "one-byte key index {} out of range 0..=10",
                raw[0]
            ))),
            16 => {
                let mut key = [0u8; 16];
                key.copy_from_slice(&raw);
                Ok(Self::Aes128(key))
            }
            32 => {
                let mut key = [0u8; 32];
                key.copy_from_slice(&raw);
                Ok(Self::Aes256(key))
            }
            n => Err(MeshError::InvalidChannelKey(format!(
                "unsupported key length {n} (expected 0, 1, 16, or 32 bytes)"
            ))),
        }
    }

    /// The expanded key actually fed to the cipher, or `None` for a
    /// plaintext channel.
    pub fn cipher_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::None => None,
            Self::Default(index) => {
                let mut key = DEFAULT_PSK;
                key[15] = key[15].wrapping_add(index - 1);
                Some(key.to_vec())
            }
            Self::Aes128(key) => Some(key.to_vec()),
            Self::Aes256(key) => Some(key.to_vec()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// One configured channel: human-readable name plus key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSettings {
    pub name: String,
    pub key: ChannelKey,
}

impl ChannelSettings {
    pub fn new(name: impl Into<String>, key_base64: &str) -> Result<Self, MeshError> {
        Ok(Self { name: name.into(), key: ChannelKey::from_base64(key_base64)? })
    }

    /// The wire-level channel index for this name + key pair.
    pub fn hash(&self) -> u8 {
        channel_hash(&self.name, &self.key)
    }

    pub fn is_plaintext(&self) -> bool {
        self.key.is_none()
    }
}

/// Byte-wise XOR fold.
pub fn xor_hash(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Deterministic one-byte channel index: XOR fold of the UTF-8 name,
/// XORed with the fold of the expanded cipher key. Receivers use it to
/// pick candidate keys for an incoming packet; it is a lossy
/// fingerprint, not an identifier, so collisions must be tolerated by
/// trying every configured key.
pub fn channel_hash(name: &str, key: &ChannelKey) -> u8 {
    let key_fold = key.cipher_bytes().map(|bytes| xor_hash(&bytes)).unwrap_or(0);
    xor_hash(name.as_bytes()) ^ key_fold
}
