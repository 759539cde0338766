//! Property-based tests for the Go-Back-N wire format.
//!
//! Verifies `decode(encode(p)) == p` across the full header field range and
//! arbitrary payload lengths (invariant 6 of the protocol spec).

use bytes::Bytes;
use gbn_proto::wire::{flags, MalformedDatagram, Packet, HEADER_LEN, MAX_PAYLOAD_LEN};
use proptest::prelude::*;

fn any_flags() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(0u16),
        Just(flags::SYN),
        Just(flags::ACK),
        Just(flags::FIN),
        Just(flags::SYN | flags::ACK),
        Just(flags::ACK | flags::FIN),
        any::<u16>(),
    ]
}

proptest! {
    #[test]
    fn packet_roundtrip(
        src_port in any::<u16>(),
        dst_port in any::<u16>(),
        seq in any::<u32>(),
        ack in any::<u32>(),
        flags in any_flags(),
        window in any::<u16>(),
        payload_len in 0usize..=MAX_PAYLOAD_LEN,
    ) {
        let payload = Bytes::from(vec![0xA5u8; payload_len]);
        let pkt = Packet {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
            window,
            payload,
        };

        let encoded = pkt.encode();
        prop_assert_eq!(encoded.len(), HEADER_LEN + payload_len);

        let decoded = Packet::decode(encoded.freeze()).unwrap();
        prop_assert_eq!(decoded, pkt);
    }

    #[test]
    fn short_buffers_are_rejected(len in 0usize..HEADER_LEN) {
        let buf = Bytes::from(vec![0u8; len]);
        prop_assert_eq!(Packet::decode(buf), Err(MalformedDatagram { len }));
    }
}
