//! Virtual-port → transport-address routing table.
//!
//! Last-writer-wins, no eviction: a peer is "registered" as a side effect of
//! the mediator observing any datagram whose `src_port` names it. There is
//! no separate registration protocol.

use std::collections::HashMap;
use std::net::SocketAddr;

#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<u16, SocketAddr>,
}

impl RoutingTable {
    pub fn new() -> Self {
        RoutingTable {
            routes: HashMap::new(),
        }
    }

    /// Record (or refresh) the transport address observed for `virtual_port`.
    /// Returns `true` if this changed the route (new port, or address moved).
    pub fn learn(&mut self, virtual_port: u16, addr: SocketAddr) -> bool {
        match self.routes.insert(virtual_port, addr) {
            Some(prev) => prev != addr,
            None => true,
        }
    }

    pub fn resolve(&self, virtual_port: u16) -> Option<SocketAddr> {
        self.routes.get(&virtual_port).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn learns_and_resolves() {
        let mut table = RoutingTable::new();
        assert!(table.learn(100, addr(40000)));
        assert_eq!(table.resolve(100), Some(addr(40000)));
    }

    #[test]
    fn unknown_port_resolves_to_none() {
        let table = RoutingTable::new();
        assert_eq!(table.resolve(999), None);
    }

    #[test]
    fn last_writer_wins() {
        let mut table = RoutingTable::new();
        table.learn(100, addr(1));
        assert!(table.learn(100, addr(2)));
        assert_eq!(table.resolve(100), Some(addr(2)));
        // Re-observing the same address is not a change.
        assert!(!table.learn(100, addr(2)));
    }
}
