//! Chunking: partition a byte stream into segments no larger than
//! [`MAX_PAYLOAD_LEN`](crate::wire::MAX_PAYLOAD_LEN), and precompute the
//! sequence number each chunk begins at.

use bytes::Bytes;

use crate::wire::MAX_PAYLOAD_LEN;

/// A file (or byte buffer) partitioned into wire-sized chunks, with the
/// starting sequence number of each chunk precomputed.
///
/// `seq_of(i)` gives the sequence number of chunk `i`'s first byte;
/// `seq_of(i) + chunks[i].len()` is one past its last byte — the value a
/// cumulative ACK must reach to fully acknowledge chunk `i`.
#[derive(Debug, Clone)]
pub struct Chunks {
    chunks: Vec<Bytes>,
    seq_of: Vec<u32>,
    start_seq: u32,
}

impl Chunks {
    /// Split `data` into `MAX_PAYLOAD_LEN`-sized chunks starting at sequence
    /// number `start_seq`.
    pub fn new(data: &[u8], start_seq: u32) -> Self {
        let mut chunks = Vec::with_capacity(data.len() / MAX_PAYLOAD_LEN + 1);
        let mut seq_of = Vec::with_capacity(chunks.capacity());
        let mut seq = start_seq;

        for piece in data.chunks(MAX_PAYLOAD_LEN) {
            seq_of.push(seq);
            chunks.push(Bytes::copy_from_slice(piece));
            seq = seq.wrapping_add(piece.len() as u32);
        }

        Chunks { chunks, seq_of, start_seq }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Bytes> {
        self.chunks.get(idx)
    }

    /// Sequence number at which chunk `idx` begins.
    pub fn seq_of(&self, idx: usize) -> u32 {
        self.seq_of[idx]
    }

    /// Sequence number one past the last byte of chunk `idx`.
    pub fn end_seq_of(&self, idx: usize) -> u32 {
        self.seq_of[idx].wrapping_add(self.chunks[idx].len() as u32)
    }

    /// Sequence number one past the very last byte of the whole stream.
    /// Equal to `start_seq` for an empty input.
    pub fn final_seq(&self) -> u32 {
        match self.chunks.len() {
            0 => self.start_seq,
            n => self.end_seq_of(n - 1),
        }
    }
}
