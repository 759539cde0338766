//! Network mediator daemon.
//!
//! Single-threaded, cooperatively scheduled around one non-blocking UDP
//! socket: each iteration either receives a datagram or drains whatever in
//! the delay queue has come due, waiting on whichever happens first.

mod routing;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use gbn_impair::{Decision, ImpairmentConfig, ImpairmentEngine};
use gbn_proto::wire::Packet;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use routing::RoutingTable;

/// Upper bound on how long we'll wait for socket readability when no delay
/// entry is pending — avoids busy-polling while still noticing new timers
/// promptly.
const MAX_POLL: Duration = Duration::from_millis(100);

/// Receive buffer — one byte larger than the max datagram so an
/// oversized/malformed read is distinguishable, not silently truncated.
const RECV_BUF_LEN: usize = gbn_proto::wire::MAX_DATAGRAM_LEN + 1;

#[derive(Debug, Parser)]
#[command(about = "Network mediator: routes and impairs traffic between sender and receiver")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Probability of dropping a forwarded datagram.
    #[arg(long, default_value_t = 0.10)]
    drop: f64,

    /// Probability of duplicating a forwarded datagram.
    #[arg(long, default_value_t = 0.10)]
    dup: f64,

    /// Probability of delaying a forwarded datagram.
    #[arg(long, default_value_t = 0.10)]
    delay: f64,

    /// Minimum delay, in seconds, when the delay trial fires.
    #[arg(long, default_value_t = 0.5)]
    delay_min: f64,

    /// Maximum delay, in seconds, when the delay trial fires.
    #[arg(long, default_value_t = 2.0)]
    delay_max: f64,

    /// Fix the impairment RNG seed for a reproducible trial sequence.
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    gbn_common::init_tracing(cli.verbose);

    let config = ImpairmentConfig {
        p_drop: cli.drop,
        p_dup: cli.dup,
        p_delay: cli.delay,
        min_delay: Duration::from_secs_f64(cli.delay_min),
        max_delay: Duration::from_secs_f64(cli.delay_max),
    };
    let mut engine = match cli.seed {
        Some(seed) => ImpairmentEngine::with_seed(config, seed),
        None => ImpairmentEngine::new(config),
    };

    let socket = UdpSocket::bind(format!("0.0.0.0:{}", cli.port))
        .await
        .with_context(|| format!("failed to bind mediator port {}", cli.port))?;
    info!(port = cli.port, ?config, "mediator listening");

    run(socket, &mut engine).await
}

async fn run(socket: UdpSocket, engine: &mut ImpairmentEngine) -> Result<()> {
    let mut routes = RoutingTable::new();
    let mut delay_queue = gbn_impair::DelayQueue::new();
    let mut buf = vec![0u8; RECV_BUF_LEN];

    loop {
        let wait = next_wait(&delay_queue);

        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, from)) => {
                        handle_datagram(&socket, &mut routes, engine, &mut delay_queue, &buf[..len], from).await;
                    }
                    Err(e) => warn!(error = %e, "recv_from failed"),
                }
            }
            _ = tokio::time::sleep(wait) => {
                drain_delay_queue(&socket, &mut delay_queue).await;
            }
        }
    }
}

fn next_wait(delay_queue: &gbn_impair::DelayQueue) -> Duration {
    match delay_queue.next_deadline() {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(MAX_POLL),
        None => MAX_POLL,
    }
}

async fn drain_delay_queue(socket: &UdpSocket, delay_queue: &mut gbn_impair::DelayQueue) {
    for (datagram, dest) in delay_queue.drain_due(Instant::now()) {
        send(socket, &datagram, dest).await;
    }
}

async fn handle_datagram(
    socket: &UdpSocket,
    routes: &mut RoutingTable,
    engine: &mut ImpairmentEngine,
    delay_queue: &mut gbn_impair::DelayQueue,
    data: &[u8],
    from: SocketAddr,
) {
    let pkt = match Packet::decode(data) {
        Ok(pkt) => pkt,
        Err(e) => {
            debug!(%from, error = %e, "dropped malformed datagram");
            return;
        }
    };

    if routes.learn(pkt.src_port, from) {
        info!(virtual_port = pkt.src_port, addr = %from, "registered route");
    }

    let Some(target) = routes.resolve(pkt.dst_port) else {
        debug!(
            dst_port = pkt.dst_port,
            src_port = pkt.src_port,
            "dropped packet for unknown destination"
        );
        return;
    };

    let datagram = Bytes::copy_from_slice(data);
    match engine.decide() {
        Decision::Drop => {
            debug!(dst_port = pkt.dst_port, "simulation: dropped");
        }
        Decision::Duplicate => {
            debug!(dst_port = pkt.dst_port, "simulation: duplicated");
            send(socket, &datagram, target).await;
            send(socket, &datagram, target).await;
        }
        Decision::Delay(delay) => {
            debug!(dst_port = pkt.dst_port, delay_ms = delay.as_millis(), "simulation: delayed");
            delay_queue.push(Instant::now() + delay, datagram, target);
        }
        Decision::Forward => {
            send(socket, &datagram, target).await;
        }
    }
}

async fn send(socket: &UdpSocket, data: &Bytes, target: SocketAddr) {
    if let Err(e) = socket.send_to(data, target).await {
        warn!(%target, error = %e, "send failed");
    }
}
