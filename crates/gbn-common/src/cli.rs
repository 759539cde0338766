//! CLI fragments shared between the sender and receiver binaries, flattened
//! into each binary's own `clap::Parser` struct rather than repeated.

use clap::Args;

/// The mediator address both endpoints need in order to reach each other.
#[derive(Debug, Clone, Args)]
pub struct NetTarget {
    /// Network mediator host.
    #[arg(long, env = "GBN_NET_HOST", default_value = "127.0.0.1")]
    pub net_host: String,

    /// Network mediator port.
    #[arg(long, env = "GBN_NET_PORT", default_value_t = 8000)]
    pub net_port: u16,
}
