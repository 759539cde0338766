//! Per-connection receiver state machine, keyed by the peer's virtual port.
//!
//! Generic over the output sink so the window-advance and cumulative-ACK
//! logic can be unit-tested against an in-memory buffer instead of a real
//! file (`std::fs::File` is what `main.rs` plugs in).

use std::collections::HashMap;
use std::io::{self, Write};

use gbn_proto::wire::{flags, Packet};
use tracing::warn;

struct Connection<W> {
    expected_seq: u32,
    sink: W,
}

/// All established connections, keyed by the peer's virtual port. A missing
/// entry means `Listen` or `Closed` — the receiver never distinguishes the
/// two since both treat non-SYN traffic the same way (silently ignored).
pub struct ConnectionTable<W> {
    my_port: u16,
    conns: HashMap<u16, Connection<W>>,
}

impl<W: Write> ConnectionTable<W> {
    pub fn new(my_port: u16) -> Self {
        ConnectionTable {
            my_port,
            conns: HashMap::new(),
        }
    }

    pub fn is_established(&self, peer_port: u16) -> bool {
        self.conns.contains_key(&peer_port)
    }

    /// Listen → Established. `make_sink` creates (or truncates) the
    /// per-connection output file; errors abort the handshake reply.
    pub fn on_syn(
        &mut self,
        pkt: &Packet,
        make_sink: impl FnOnce(u16) -> io::Result<W>,
    ) -> io::Result<Packet> {
        let expected_seq = pkt.seq.wrapping_add(1);
        let sink = make_sink(pkt.src_port)?;
        self.conns
            .insert(pkt.src_port, Connection { expected_seq, sink });

        Ok(Packet::control(
            self.my_port,
            pkt.src_port,
            0,
            expected_seq,
            flags::SYN | flags::ACK,
        ))
    }

    /// Established, data packet (no SYN, no FIN). Returns the cumulative ACK
    /// to send, or `None` if the peer has no established connection
    /// (pre-handshake datagram — silently discarded per the protocol).
    pub fn on_data(&mut self, pkt: &Packet) -> Option<Packet> {
        let conn = self.conns.get_mut(&pkt.src_port)?;

        if pkt.seq == conn.expected_seq && !pkt.payload.is_empty() {
            if let Err(e) = conn.sink.write_all(&pkt.payload) {
                warn!(peer = pkt.src_port, error = %e, "write failed");
            } else if let Err(e) = conn.sink.flush() {
                warn!(peer = pkt.src_port, error = %e, "flush failed");
            } else {
                conn.expected_seq = conn.expected_seq.wrapping_add(pkt.payload.len() as u32);
            }
        }
        // Duplicate (seq < expected) and out-of-order (seq > expected) both
        // fall through here: the payload is discarded and we reply with the
        // current cumulative ACK either way — this is what makes Go-Back-N
        // retransmission work on the sender side.

        Some(Packet::control(
            self.my_port,
            pkt.src_port,
            0,
            conn.expected_seq,
            flags::ACK,
        ))
    }

    /// Established → Closed on FIN. Returns the FIN-ACK to send, or `None`
    /// if there was no connection to close.
    pub fn on_fin(&mut self, pkt: &Packet) -> Option<Packet> {
        self.conns.remove(&pkt.src_port)?;
        Some(Packet::control(
            self.my_port,
            pkt.src_port,
            0,
            pkt.seq.wrapping_add(1),
            flags::ACK,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::io::Cursor;

    fn syn(src: u16, seq: u32) -> Packet {
        Packet::control(src, 9999, seq, 0, flags::SYN)
    }

    fn data(src: u16, seq: u32, payload: &[u8]) -> Packet {
        Packet::data(src, 9999, seq, Bytes::copy_from_slice(payload))
    }

    #[test]
    fn syn_establishes_and_sets_expected_seq() {
        let mut table: ConnectionTable<Cursor<Vec<u8>>> = ConnectionTable::new(9999);
        let reply = table
            .on_syn(&syn(100, 500), |_| Ok(Cursor::new(Vec::new())))
            .unwrap();
        assert!(reply.has_flags(flags::SYN | flags::ACK));
        assert_eq!(reply.ack, 501);
        assert!(table.is_established(100));
    }

    #[test]
    fn in_order_data_appends_and_acks_cumulatively() {
        let mut table: ConnectionTable<Cursor<Vec<u8>>> = ConnectionTable::new(9999);
        table
            .on_syn(&syn(100, 500), |_| Ok(Cursor::new(Vec::new())))
            .unwrap();

        let reply = table.on_data(&data(100, 501, b"hello")).unwrap();
        assert_eq!(reply.ack, 506);

        let reply2 = table.on_data(&data(100, 506, b" world")).unwrap();
        assert_eq!(reply2.ack, 512);
    }

    #[test]
    fn duplicate_does_not_advance_or_rewrite() {
        let mut table: ConnectionTable<Cursor<Vec<u8>>> = ConnectionTable::new(9999);
        table
            .on_syn(&syn(100, 500), |_| Ok(Cursor::new(Vec::new())))
            .unwrap();
        table.on_data(&data(100, 501, b"hello")).unwrap();

        // Replay the same in-order segment: seq 501 is now < expected (506).
        let reply = table.on_data(&data(100, 501, b"hello")).unwrap();
        assert_eq!(reply.ack, 506, "duplicate ack must still be cumulative");
    }

    #[test]
    fn out_of_order_is_discarded_but_still_acked() {
        let mut table: ConnectionTable<Cursor<Vec<u8>>> = ConnectionTable::new(9999);
        table
            .on_syn(&syn(100, 500), |_| Ok(Cursor::new(Vec::new())))
            .unwrap();

        // Expected is 501; this arrives early.
        let reply = table.on_data(&data(100, 510, b"out of order")).unwrap();
        assert_eq!(reply.ack, 501);
    }

    #[test]
    fn data_before_syn_is_silently_ignored() {
        let mut table: ConnectionTable<Cursor<Vec<u8>>> = ConnectionTable::new(9999);
        assert!(table.on_data(&data(100, 501, b"hello")).is_none());
    }

    #[test]
    fn fin_closes_and_acks_one_past_fin_seq() {
        let mut table: ConnectionTable<Cursor<Vec<u8>>> = ConnectionTable::new(9999);
        table
            .on_syn(&syn(100, 500), |_| Ok(Cursor::new(Vec::new())))
            .unwrap();
        let reply = table
            .on_fin(&Packet::control(100, 9999, 506, 0, flags::FIN))
            .unwrap();
        assert_eq!(reply.ack, 507);
        assert!(!table.is_established(100));
    }

    #[test]
    fn fin_on_unknown_connection_is_ignored() {
        let mut table: ConnectionTable<Cursor<Vec<u8>>> = ConnectionTable::new(9999);
        assert!(table
            .on_fin(&Packet::control(100, 9999, 506, 0, flags::FIN))
            .is_none());
    }
}
