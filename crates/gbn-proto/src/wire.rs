//! # Wire format
//!
//! Fixed 16-byte header followed by 0..=1008 bytes of opaque payload. No
//! variable-length fields, no framing beyond the datagram boundary itself —
//! one UDP datagram is always exactly one packet.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            src_port          |            dst_port          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                              seq                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                              ack                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |             flags             |            window            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        payload (0..=1008)                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All multi-byte fields are big-endian. This module is pure — it has no
//! sockets, no clock, no allocation beyond the buffers the caller provides.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Header size in bytes: 2×u16 ports + 2×u32 seq/ack + u16 flags + u16 window.
pub const HEADER_LEN: usize = 16;

/// Maximum total datagram size the protocol will emit or accept.
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// Maximum payload bytes per packet (`MAX_DATAGRAM_LEN - HEADER_LEN`).
pub const MAX_PAYLOAD_LEN: usize = MAX_DATAGRAM_LEN - HEADER_LEN;

/// Flag bits, ORed into the 16-bit `flags` field.
pub mod flags {
    pub const SYN: u16 = 0x01;
    pub const ACK: u16 = 0x02;
    pub const FIN: u16 = 0x04;
}

/// A decode failure: the datagram was too short to contain a header.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed datagram: {len} bytes, need at least {HEADER_LEN}")]
pub struct MalformedDatagram {
    pub len: usize,
}

/// A fully decoded packet: header fields plus an owned payload slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: u16,
    pub window: u16,
    pub payload: Bytes,
}

impl Packet {
    /// True if every bit in `mask` is set in this packet's flags.
    #[inline]
    pub fn has_flags(&self, mask: u16) -> bool {
        self.flags & mask == mask
    }

    #[inline]
    pub fn is_syn(&self) -> bool {
        self.flags & flags::SYN != 0
    }

    #[inline]
    pub fn is_fin(&self) -> bool {
        self.flags & flags::FIN != 0
    }

    #[inline]
    pub fn is_ack(&self) -> bool {
        self.flags & flags::ACK != 0
    }

    /// Construct a control packet carrying no payload.
    pub fn control(src_port: u16, dst_port: u16, seq: u32, ack: u32, flags: u16) -> Self {
        Packet {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
            window: 0,
            payload: Bytes::new(),
        }
    }

    /// Construct a data packet, `flags::ACK` set, carrying `payload`.
    pub fn data(src_port: u16, dst_port: u16, seq: u32, payload: Bytes) -> Self {
        Packet {
            src_port,
            dst_port,
            seq,
            ack: 0,
            flags: flags::ACK,
            window: 0,
            payload,
        }
    }

    /// Total encoded length of this packet (header + payload).
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Encode header and payload into a fresh buffer.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u16(self.src_port);
        buf.put_u16(self.dst_port);
        buf.put_u32(self.seq);
        buf.put_u32(self.ack);
        buf.put_u16(self.flags);
        buf.put_u16(self.window);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decode a packet from a received datagram. Rejects anything shorter
    /// than [`HEADER_LEN`]; anything longer than [`MAX_DATAGRAM_LEN`] is
    /// still decoded (the caller's socket read is what bounds datagram
    /// size on the wire, not this function).
    pub fn decode(mut buf: impl Buf) -> Result<Self, MalformedDatagram> {
        let len = buf.remaining();
        if len < HEADER_LEN {
            return Err(MalformedDatagram { len });
        }

        let src_port = buf.get_u16();
        let dst_port = buf.get_u16();
        let seq = buf.get_u32();
        let ack = buf.get_u32();
        let flags = buf.get_u16();
        let window = buf.get_u16();
        let payload = buf.copy_to_bytes(buf.remaining());

        Ok(Packet {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
            window,
            payload,
        })
    }
}
