//! Message kinds and the binary frame codec.
//!
//! Every message travels as one frame:
//!
//! ```text
//! kind  u8        1..=5
//! len   u32 LE    body length
//! body  [u8; len]
//! ```
//!
//! A packet is any number of frames back to back. Bodies:
//!
//! | kind | message        | body                                         |
//! |------|----------------|----------------------------------------------|
//! | 1    | `CloneSync`    | `type_id u32`, clone payload (rest of body)  |
//! | 2    | `ModPayload`   | `type_id u32`, `slot u32`, `sender u16`, data |
//! | 3    | `JoinRequest`  | `peer u16`, `fingerprint u64`                |
//! | 4    | `JoinComplete` | `count u32`                                  |
//! | 5    | `JoinRejected` | `fingerprint u64`                            |

use tilework_core::{PacketReader, PacketWriter, PeerId, ProcessorTypeId, SlotId};

use crate::error::NetError;

const KIND_CLONE_SYNC: u8 = 1;
const KIND_MOD_PAYLOAD: u8 = 2;
const KIND_JOIN_REQUEST: u8 = 3;
const KIND_JOIN_COMPLETE: u8 = 4;
const KIND_JOIN_REJECTED: u8 = 5;

/// Bytes before every frame body.
pub const FRAME_HEADER_LEN: usize = 5;

/// A message between peers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetMessage {
    /// Replicated instance state, including deaths (`active=false`).
    CloneSync {
        /// Sender's type ID.
        type_id: ProcessorTypeId,
        /// Output of `net_clone_send`.
        payload: Vec<u8>,
    },
    /// Mod-defined bytes for one instance's `receive_data`.
    ModPayload {
        /// Sender's type ID.
        type_id: ProcessorTypeId,
        /// Sender's slot for the instance.
        slot: SlotId,
        /// Originating peer.
        sender: PeerId,
        /// Output of `send_data`.
        data: Vec<u8>,
    },
    /// A peer asks for the current world state.
    JoinRequest {
        /// The joining peer.
        peer: PeerId,
        /// The joining peer's registry fingerprint.
        fingerprint: u64,
    },
    /// Ends a join-sync batch.
    JoinComplete {
        /// Clone-syncs sent in the batch.
        count: u32,
    },
    /// The join was refused because the registries differ.
    JoinRejected {
        /// The authoritative peer's registry fingerprint.
        fingerprint: u64,
    },
}

impl NetMessage {
    fn kind(&self) -> u8 {
        match self {
            Self::CloneSync { .. } => KIND_CLONE_SYNC,
            Self::ModPayload { .. } => KIND_MOD_PAYLOAD,
            Self::JoinRequest { .. } => KIND_JOIN_REQUEST,
            Self::JoinComplete { .. } => KIND_JOIN_COMPLETE,
            Self::JoinRejected { .. } => KIND_JOIN_REJECTED,
        }
    }

    /// Append this message as one frame.
    pub fn encode_into(&self, w: &mut PacketWriter) {
        let mut body = PacketWriter::new();
        match self {
            Self::CloneSync { type_id, payload } => {
                body.write_u32(type_id.0);
                body.write_raw(payload);
            }
            Self::ModPayload {
                type_id,
                slot,
                sender,
                data,
            } => {
                body.write_u32(type_id.0);
                body.write_u32(slot.0);
                body.write_u16(sender.0);
                body.write_raw(data);
            }
            Self::JoinRequest { peer, fingerprint } => {
                body.write_u16(peer.0);
                body.write_u64(*fingerprint);
            }
            Self::JoinComplete { count } => body.write_u32(*count),
            Self::JoinRejected { fingerprint } => body.write_u64(*fingerprint),
        }
        w.write_u8(self.kind());
        w.write_bytes(body.as_bytes());
    }

    /// Encode as a single-frame packet.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        self.encode_into(&mut w);
        w.into_bytes()
    }

    /// Read one frame.
    pub fn read(r: &mut PacketReader<'_>) -> Result<Self, NetError> {
        let kind = r.read_u8()?;
        let body = r.read_bytes()?;
        Self::parse_body(kind, body)
    }

    fn parse_body(kind: u8, body: &[u8]) -> Result<Self, NetError> {
        let mut b = PacketReader::new(body);
        let msg = match kind {
            KIND_CLONE_SYNC => Self::CloneSync {
                type_id: ProcessorTypeId(b.read_u32()?),
                payload: b.rest().to_vec(),
            },
            KIND_MOD_PAYLOAD => Self::ModPayload {
                type_id: ProcessorTypeId(b.read_u32()?),
                slot: SlotId(b.read_u32()?),
                sender: PeerId(b.read_u16()?),
                data: b.rest().to_vec(),
            },
            KIND_JOIN_REQUEST => Self::JoinRequest {
                peer: PeerId(b.read_u16()?),
                fingerprint: b.read_u64()?,
            },
            KIND_JOIN_COMPLETE => Self::JoinComplete {
                count: b.read_u32()?,
            },
            KIND_JOIN_REJECTED => Self::JoinRejected {
                fingerprint: b.read_u64()?,
            },
            kind => return Err(NetError::UnknownKind { kind }),
        };
        let fixed_size = !matches!(msg, Self::CloneSync { .. } | Self::ModPayload { .. });
        if fixed_size && b.remaining() > 0 {
            return Err(NetError::Malformed {
                detail: format!("{} trailing bytes in kind {kind} body", b.remaining()),
            });
        }
        Ok(msg)
    }

    /// Decode every frame in a packet, in order. Any bad frame fails the
    /// whole packet.
    pub fn decode_packet(bytes: &[u8]) -> Result<Vec<Self>, NetError> {
        let mut r = PacketReader::new(bytes);
        let mut out = Vec::new();
        while r.remaining() > 0 {
            out.push(Self::read(&mut r)?);
        }
        Ok(out)
    }

    /// Decode a packet, skipping frames whose body cannot be parsed.
    ///
    /// The length prefix still locates the next frame after an unknown
    /// kind or a bad body, so only a broken frame header fails the packet.
    pub fn decode_frames(bytes: &[u8]) -> Result<DecodedPacket, NetError> {
        let mut r = PacketReader::new(bytes);
        let mut out = DecodedPacket::default();
        while r.remaining() > 0 {
            let kind = r.read_u8()?;
            let body = r.read_bytes()?;
            match Self::parse_body(kind, body) {
                Ok(msg) => out.messages.push(msg),
                Err(e) => out.skipped.push(e),
            }
        }
        Ok(out)
    }
}

/// Result of [`NetMessage::decode_frames`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedPacket {
    /// Frames that parsed, in packet order.
    pub messages: Vec<NetMessage>,
    /// Why each skipped frame was skipped, in packet order.
    pub skipped: Vec<NetError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilework_core::WireError;

    fn samples() -> Vec<NetMessage> {
        vec![
            NetMessage::CloneSync {
                type_id: ProcessorTypeId(2),
                payload: vec![1, 4, 0, 0, 0, 5, 0, 6, 0],
            },
            NetMessage::ModPayload {
                type_id: ProcessorTypeId(0),
                slot: SlotId(4),
                sender: PeerId(7),
                data: vec![9, 9],
            },
            NetMessage::JoinRequest {
                peer: PeerId(1),
                fingerprint: 0xfeed_beef,
            },
            NetMessage::JoinComplete { count: 3 },
            NetMessage::JoinRejected { fingerprint: 1 },
        ]
    }

    #[test]
    fn packet_of_frames_decodes_in_order() {
        let mut w = PacketWriter::new();
        for m in samples() {
            m.encode_into(&mut w);
        }
        assert_eq!(NetMessage::decode_packet(w.as_bytes()).unwrap(), samples());
    }

    #[test]
    fn frame_header_is_kind_then_length() {
        let bytes = NetMessage::JoinComplete { count: 3 }.encode();
        assert_eq!(bytes, [4, 4, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(bytes.len(), FRAME_HEADER_LEN + 4);
    }

    #[test]
    fn unknown_kind_rejected() {
        assert_eq!(
            NetMessage::decode_packet(&[0x42, 0, 0, 0, 0]),
            Err(NetError::UnknownKind { kind: 0x42 })
        );
    }

    #[test]
    fn truncated_frame_is_wire_error() {
        let bytes = samples()[1].encode();
        for cut in 1..bytes.len() {
            let err = NetMessage::decode_packet(&bytes[..cut]).unwrap_err();
            assert!(
                matches!(err, NetError::Wire(WireError::Truncated { .. })),
                "cut {cut}: {err:?}"
            );
        }
    }

    #[test]
    fn short_body_is_wire_error() {
        // JoinRequest frame claiming a 2-byte body.
        let bytes = [3, 2, 0, 0, 0, 1, 0];
        assert!(matches!(
            NetMessage::decode_packet(&bytes),
            Err(NetError::Wire(WireError::Truncated { .. }))
        ));
    }

    #[test]
    fn unknown_frame_is_skipped_and_neighbours_kept() {
        let mut w = PacketWriter::new();
        samples()[0].encode_into(&mut w);
        // A kind from a newer build, with a body.
        w.write_u8(0x42);
        w.write_bytes(&[1, 2, 3]);
        // A known kind whose body is too short.
        w.write_u8(4);
        w.write_bytes(&[1]);
        samples()[3].encode_into(&mut w);

        let decoded = NetMessage::decode_frames(w.as_bytes()).unwrap();
        assert_eq!(decoded.messages, vec![samples()[0].clone(), samples()[3].clone()]);
        assert_eq!(decoded.skipped.len(), 2);
        assert_eq!(decoded.skipped[0], NetError::UnknownKind { kind: 0x42 });
        assert!(matches!(decoded.skipped[1], NetError::Wire(WireError::Truncated { .. })));
        // The strict decoder refuses the same packet.
        assert!(NetMessage::decode_packet(w.as_bytes()).is_err());
    }

    #[test]
    fn broken_frame_header_fails_lenient_decode() {
        let mut bytes = samples()[3].encode();
        bytes.extend_from_slice(&[1, 9, 0]);
        assert!(matches!(
            NetMessage::decode_frames(&bytes),
            Err(NetError::Wire(WireError::Truncated { .. }))
        ));
    }

    #[test]
    fn trailing_body_bytes_are_malformed() {
        let bytes = [4, 5, 0, 0, 0, 1, 0, 0, 0, 9];
        assert!(matches!(
            NetMessage::decode_packet(&bytes),
            Err(NetError::Malformed { .. })
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = NetMessage::decode_packet(&bytes);
            let _ = NetMessage::decode_frames(&bytes);
        }

        #[test]
        fn clone_sync_payload_survives(type_id in any::<u32>(), payload in proptest::collection::vec(any::<u8>(), 0..32)) {
            let msg = NetMessage::CloneSync { type_id: ProcessorTypeId(type_id), payload };
            prop_assert_eq!(NetMessage::decode_packet(&msg.encode()).unwrap(), vec![msg]);
        }
    }
}
