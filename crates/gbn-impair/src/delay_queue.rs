//! Deadline-ordered queue for datagrams the impairment engine decided to
//! delay. A binary heap keyed by `deliver_at` suffices — entries with equal
//! deadlines may drain in either order, which the protocol must already
//! tolerate (the mediator→receiver link can reorder).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;

#[derive(Debug)]
struct Entry {
    deliver_at: Instant,
    datagram: Bytes,
    destination: SocketAddr,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deliver_at == other.deliver_at
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest deadline pops first.
        other.deliver_at.cmp(&self.deliver_at)
    }
}

/// Holds `(deliver_at, datagram, destination)` triples, draining in
/// ascending deadline order.
#[derive(Debug, Default)]
pub struct DelayQueue {
    heap: BinaryHeap<Entry>,
}

impl DelayQueue {
    pub fn new() -> Self {
        DelayQueue {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, deliver_at: Instant, datagram: Bytes, destination: SocketAddr) {
        self.heap.push(Entry {
            deliver_at,
            datagram,
            destination,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Deadline of the earliest-pending entry, if any — the scheduler's
    /// next wake-up time.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.deliver_at)
    }

    /// Pop every entry whose deadline has passed, in deadline order.
    pub fn drain_due(&mut self, now: Instant) -> Vec<(Bytes, SocketAddr)> {
        let mut due = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.deliver_at > now {
                break;
            }
            let entry = self.heap.pop().unwrap();
            due.push((entry.datagram, entry.destination));
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn drains_in_deadline_order_regardless_of_insertion_order() {
        let base = Instant::now();
        let mut q = DelayQueue::new();
        q.push(base + Duration::from_millis(300), Bytes::from_static(b"c"), addr());
        q.push(base + Duration::from_millis(100), Bytes::from_static(b"a"), addr());
        q.push(base + Duration::from_millis(200), Bytes::from_static(b"b"), addr());

        let due = q.drain_due(base + Duration::from_millis(250));
        let order: Vec<_> = due.iter().map(|(d, _)| d.clone()).collect();
        assert_eq!(order, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        assert_eq!(q.next_deadline(), Some(base + Duration::from_millis(300)));
    }

    #[test]
    fn empty_queue_has_no_deadline() {
        let q = DelayQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.next_deadline(), None);
    }

    #[test]
    fn nothing_due_yet_returns_empty() {
        let base = Instant::now();
        let mut q = DelayQueue::new();
        q.push(base + Duration::from_secs(10), Bytes::from_static(b"x"), addr());
        assert!(q.drain_due(base).is_empty());
    }
}
