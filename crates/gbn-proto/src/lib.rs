//! Wire codec and chunking for the Go-Back-N file-transfer protocol.
//!
//! Pure logic, no I/O and no clock — shared by the mediator, sender, and
//! receiver binaries.

pub mod chunk;
pub mod wire;

pub const WINDOW_SIZE: usize = 5;
pub const START_SEQ: u32 = 100;
