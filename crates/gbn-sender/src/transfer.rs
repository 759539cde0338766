//! Sender-side Go-Back-N window bookkeeping — pure logic, no sockets, no
//! clock reads beyond what the caller passes in. Kept separate from
//! `main.rs` so the window-advance arithmetic is unit-testable without a
//! UDP socket.

use std::time::Instant;

use gbn_proto::chunk::Chunks;
use gbn_proto::WINDOW_SIZE;

/// Tracks which chunks are in flight and which have been fully acked.
pub struct Window {
    chunks: Chunks,
    base_idx: usize,
    next_idx: usize,
    base_seq: u32,
    last_progress_at: Instant,
}

impl Window {
    pub fn new(chunks: Chunks, start_seq: u32, now: Instant) -> Self {
        Window {
            chunks,
            base_idx: 0,
            next_idx: 0,
            base_seq: start_seq,
            last_progress_at: now,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_complete(&self) -> bool {
        self.base_idx >= self.chunks.len()
    }

    pub fn base_seq(&self) -> u32 {
        self.base_seq
    }

    /// At most `WINDOW_SIZE` chunks unacked at any time — invariant 4.
    pub fn in_flight(&self) -> usize {
        self.next_idx - self.base_idx
    }

    /// Returns the next chunk to transmit and its sequence number, advancing
    /// `next_idx`, or `None` if the window is full or the stream is exhausted.
    pub fn next_to_send(&mut self) -> Option<(u32, bytes::Bytes)> {
        if self.next_idx >= self.chunks.len() || self.in_flight() >= WINDOW_SIZE {
            return None;
        }
        let seq = self.chunks.seq_of(self.next_idx);
        let data = self.chunks.get(self.next_idx).cloned().unwrap_or_default();
        self.next_idx += 1;
        Some((seq, data))
    }

    /// Process a cumulative ACK. Returns `true` if it advanced `base_idx`
    /// (invariant 3: the sender only advances when `ack` covers full chunk
    /// boundaries).
    pub fn on_ack(&mut self, ack: u32, now: Instant) -> bool {
        if ack <= self.base_seq {
            return false;
        }
        let mut advanced = false;
        while self.base_idx < self.chunks.len() {
            let end_seq = self.chunks.end_seq_of(self.base_idx);
            if ack >= end_seq {
                self.base_idx += 1;
                self.base_seq = end_seq;
                advanced = true;
            } else {
                break;
            }
        }
        if advanced {
            self.last_progress_at = now;
        }
        advanced
    }

    /// Whether the retransmit timer has fired: no progress for `timeout`.
    pub fn timed_out(&self, now: Instant, timeout: std::time::Duration) -> bool {
        now.duration_since(self.last_progress_at) > timeout
    }

    /// Go-Back-N reset: rewind `next_idx` to `base_idx` so the whole
    /// outstanding window gets retransmitted.
    pub fn retransmit_reset(&mut self, now: Instant) {
        self.next_idx = self.base_idx;
        self.last_progress_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbn_proto::wire::MAX_PAYLOAD_LEN;

    fn window_with(total_bytes: usize, start_seq: u32) -> Window {
        let data = vec![0u8; total_bytes];
        Window::new(Chunks::new(&data, start_seq), start_seq, Instant::now())
    }

    #[test]
    fn window_bound_never_exceeds_five() {
        let mut w = window_with(MAX_PAYLOAD_LEN * 20, 100);
        let mut sent = 0;
        while w.next_to_send().is_some() {
            sent += 1;
            assert!(w.in_flight() <= WINDOW_SIZE);
        }
        assert_eq!(sent, WINDOW_SIZE);
    }

    #[test]
    fn ack_below_base_seq_does_not_advance() {
        let mut w = window_with(MAX_PAYLOAD_LEN * 3, 100);
        while w.next_to_send().is_some() {}
        assert!(!w.on_ack(100, Instant::now()));
        assert_eq!(w.base_seq(), 100);
    }

    #[test]
    fn ack_advances_only_on_full_chunk_boundaries() {
        let mut w = window_with(MAX_PAYLOAD_LEN * 3, 100);
        while w.next_to_send().is_some() {}
        let first_end = 100 + MAX_PAYLOAD_LEN as u32;

        // Partial ack inside chunk 0 must not advance base.
        assert!(!w.on_ack(first_end - 1, Instant::now()));
        assert_eq!(w.base_seq(), 100);

        // Ack exactly at chunk 0's end advances exactly one chunk.
        assert!(w.on_ack(first_end, Instant::now()));
        assert_eq!(w.base_seq(), first_end);
    }

    #[test]
    fn ack_can_cover_multiple_chunks_cumulatively() {
        let mut w = window_with(MAX_PAYLOAD_LEN * 4, 100);
        while w.next_to_send().is_some() {}
        let third_end = 100 + 3 * MAX_PAYLOAD_LEN as u32;
        assert!(w.on_ack(third_end, Instant::now()));
        assert_eq!(w.base_seq(), third_end);
        assert_eq!(w.in_flight(), 1);
    }

    #[test]
    fn retransmit_reset_rewinds_next_to_base() {
        let mut w = window_with(MAX_PAYLOAD_LEN * 10, 100);
        while w.next_to_send().is_some() {}
        assert_eq!(w.in_flight(), WINDOW_SIZE);
        w.retransmit_reset(Instant::now());
        assert_eq!(w.in_flight(), 0);
    }

    #[test]
    fn completion_detected_when_base_reaches_total() {
        let mut w = window_with(MAX_PAYLOAD_LEN, 100);
        while w.next_to_send().is_some() {}
        assert!(!w.is_complete());
        let end = w.chunks.final_seq();
        w.on_ack(end, Instant::now());
        assert!(w.is_complete());
    }

    #[test]
    fn timed_out_after_timeout_duration() {
        let now = Instant::now();
        let w = window_with(MAX_PAYLOAD_LEN, 100);
        assert!(!w.timed_out(now, std::time::Duration::from_millis(500)));
        let later = now + std::time::Duration::from_millis(600);
        assert!(w.timed_out(later, std::time::Duration::from_millis(500)));
    }
}
