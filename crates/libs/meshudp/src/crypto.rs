//! Symmetric payload encryption.
//!
//! AES-CTR keyed by the channel's expanded key. The counter block is
//! derived from packet metadata (id and sender number, each
//! zero-extended to u64 little-endian), so encryption is stateless
//! across packets and any holder of the key can decrypt regardless of
//! arrival order.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::{Aes128, Aes256};
use ctr::Ctr128BE;
use prost::Message;

use meshudp_proto::{Data, MeshPacket};

use crate::channel::ChannelSettings;
use crate::error::MeshError;

type Aes128Ctr = Ctr128BE<Aes128>;
type Aes256Ctr = Ctr128BE<Aes256>;

/// Initial counter block for a packet: `id` then `from`, both LE u64.
pub fn packet_nonce(packet_id: u32, from: u32) -> [u8; 16] {
    let mut nonce = [0u8; 16];
    nonce[..8].copy_from_slice(&u64::from(packet_id).to_le_bytes());
    nonce[8..].copy_from_slice(&u64::from(from).to_le_bytes());
    nonce
}

fn apply_keystream(key: &[u8], nonce: &[u8; 16], buf: &mut [u8]) -> Result<(), MeshError> {
    match key.len() {
        16 => {
            let mut cipher = Aes128Ctr::new_from_slices(key, nonce)
                .map_err(|_| MeshError::Decrypt("bad cipher key or nonce length"))?;
            cipher.apply_keystream(buf);
            Ok(())
        }
        32 => {
            let mut cipher = Aes256Ctr::new_from_slices(key, nonce)
                .map_err(|_| MeshError::Decrypt("bad cipher key or nonce length"))?;
            cipher.apply_keystream(buf);
            Ok(())
        }
        _ => Err(MeshError::Decrypt("cipher key must be 16 or 32 bytes")),
    }
}

/// Encrypt an inner payload for the packet identified by
/// `(packet_id, from)` on the given channel.
pub fn encrypt_payload(
    channel: &ChannelSettings,
    packet_id: u32,
    from: u32,
    data: &Data,
) -> Result<Vec<u8>, MeshError> {
    let key = channel
        .key
        .cipher_bytes()
        .ok_or(MeshError::Decrypt("channel has no key configured"))?;
    let mut buf = data.encode_to_vec();
    apply_keystream(&key, &packet_nonce(packet_id, from), &mut buf)?;
    Ok(buf)
}

/// Decrypt against one specific channel, rejecting up front when the
/// channel's hash does not match the packet's stamped channel byte.
pub fn decrypt_packet(packet: &MeshPacket, channel: &ChannelSettings) -> Result<Data, MeshError> {
    if u32::from(channel.hash()) != packet.channel {
        return Err(MeshError::Decrypt("channel hash mismatch"));
    }
    try_decrypt(packet, channel)
}

/// Decrypt ignoring the stamped channel byte. The receive loop uses
/// this to try every configured key, since the one-byte hash can
/// collide between different channel configs.
pub fn try_decrypt(packet: &MeshPacket, channel: &ChannelSettings) -> Result<Data, MeshError> {
    let ciphertext = packet
        .encrypted()
        .ok_or(MeshError::Decrypt("packet carries no ciphertext"))?;
    let key = channel
        .key
        .cipher_bytes()
        .ok_or(MeshError::Decrypt("channel has no key configured"))?;
    let mut buf = ciphertext.to_vec();
    apply_keystream(&key, &packet_nonce(packet.id, packet.from), &mut buf)?;
    // Structural validation is the only signal CTR gives us that the
    // key was right.
    Data::decode(buf.as_slice())
        .map_err(|_| MeshError::Decrypt("plaintext is not a valid payload"))
}
