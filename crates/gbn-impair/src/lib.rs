//! Shared loss/duplicate/delay network impairment engine.
//!
//! Used standalone by the mediator process, and inline by the receiver's
//! integrated-impairment topology (see the design note on both topologies
//! sharing one engine).

pub mod delay_queue;
pub mod engine;

pub use delay_queue::DelayQueue;
pub use engine::{Decision, ImpairmentConfig, ImpairmentEngine};
