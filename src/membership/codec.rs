//! Wire Codec
//!
//! Fixed-width little-endian layout shared by every node of a deployment:
//!
//! ```text
//! message := kind:u8 | id:u32 | port:u16 | heartbeat:u64 | entry*
//! entry   := id:u32 | port:u16 | heartbeat:u64 | timestamp:u64
//! ```
//!
//! The entry count is implied by the buffer length. The per-entry timestamp
//! is written as zero and replaced on decode with the receiver's clock.

use super::error::CodecError;
use super::types::{MembershipEntry, Message, MessageKind, NodeIdentity, Timestamp};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const KIND_LEN: usize = 1;
const ID_LEN: usize = 4;
const PORT_LEN: usize = 2;
const HEARTBEAT_LEN: usize = 8;
const TIMESTAMP_LEN: usize = 8;

const IDENTITY_LEN: usize = ID_LEN + PORT_LEN;

/// Size of the fixed prefix every message starts with.
pub const HEADER_LEN: usize = KIND_LEN + IDENTITY_LEN + HEARTBEAT_LEN;
/// Size of one encoded `MembershipEntry`.
pub const ENTRY_LEN: usize = IDENTITY_LEN + HEARTBEAT_LEN + TIMESTAMP_LEN;

/// Serializes a message into a freshly allocated buffer.
pub fn encode(message: &Message) -> Bytes {
    match message {
        Message::JoinRequest { sender, heartbeat } => {
            let mut buf = BytesMut::with_capacity(HEADER_LEN);
            put_header(&mut buf, MessageKind::JoinRequest, *sender, *heartbeat);
            buf.freeze()
        }
        Message::Gossip {
            sender,
            heartbeat,
            entries,
        } => {
            let mut buf = BytesMut::with_capacity(HEADER_LEN + entries.len() * ENTRY_LEN);
            put_header(&mut buf, MessageKind::Gossip, *sender, *heartbeat);
            for entry in entries {
                put_identity(&mut buf, entry.identity);
                buf.put_u64_le(entry.heartbeat);
                buf.put_u64_le(0);
            }
            buf.freeze()
        }
    }
}

/// Parses a message, stamping every carried entry with `received_at`.
pub fn decode(buf: &[u8], received_at: Timestamp) -> Result<Message, CodecError> {
    if buf.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            len: buf.len(),
            min: HEADER_LEN,
        });
    }

    let mut cursor = buf;
    let tag = cursor.get_u8();
    let kind = MessageKind::try_from(tag).map_err(CodecError::UnknownKind)?;
    let sender = get_identity(&mut cursor);
    let heartbeat = cursor.get_u64_le();

    match kind {
        MessageKind::JoinRequest => {
            if cursor.has_remaining() {
                return Err(CodecError::TrailingBytes(cursor.remaining()));
            }
            Ok(Message::JoinRequest { sender, heartbeat })
        }
        MessageKind::Gossip => {
            let region = cursor.remaining();
            if region % ENTRY_LEN != 0 {
                return Err(CodecError::MisalignedEntries {
                    len: region,
                    entry_len: ENTRY_LEN,
                });
            }

            let mut entries = Vec::with_capacity(region / ENTRY_LEN);
            while cursor.has_remaining() {
                let identity = get_identity(&mut cursor);
                let heartbeat = cursor.get_u64_le();
                // The sender's timestamp means nothing on this node.
                cursor.advance(TIMESTAMP_LEN);
                entries.push(MembershipEntry::new(identity, heartbeat, received_at));
            }

            Ok(Message::Gossip {
                sender,
                heartbeat,
                entries,
            })
        }
    }
}

fn put_header(buf: &mut BytesMut, kind: MessageKind, sender: NodeIdentity, heartbeat: u64) {
    buf.put_u8(kind as u8);
    put_identity(buf, sender);
    buf.put_u64_le(heartbeat);
}

fn put_identity(buf: &mut BytesMut, identity: NodeIdentity) {
    buf.put_u32_le(identity.id);
    buf.put_u16_le(identity.port);
}

fn get_identity(cursor: &mut &[u8]) -> NodeIdentity {
    let id = cursor.get_u32_le();
    let port = cursor.get_u16_le();
    NodeIdentity { id, port }
}
