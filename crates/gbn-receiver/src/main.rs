//! Receiver daemon: accepts the handshake, writes the in-order byte stream
//! to `data/<peer_virtual_port>.in`, emits cumulative ACKs, accepts
//! teardown.
//!
//! Single-threaded event loop around one UDP socket, same shape as the
//! mediator and sender. With `--integrated-impair`, the loss/duplicate/delay
//! engine that the standalone mediator runs is folded in here instead
//! (spec §4.5's receiver-integrated topology) — the injection point moves
//! from the mediator's outbound hop to the receiver's inbound hop, but it
//! is the exact same `gbn-impair` engine either way.

mod connection;

use std::fs::{self, File, OpenOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use gbn_common::NetTarget;
use gbn_impair::{Decision, ImpairmentConfig, ImpairmentEngine};
use gbn_proto::wire::Packet;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use connection::ConnectionTable;

const MAX_POLL: Duration = Duration::from_millis(100);
const DATA_DIR: &str = "data";

#[derive(Debug, Parser)]
#[command(about = "Receiver daemon: accepts a Go-Back-N transfer and persists it to disk")]
struct Cli {
    /// Virtual port this receiver listens on.
    #[arg(long, default_value_t = 9999)]
    port: u16,

    #[command(flatten)]
    net: NetTarget,

    /// Run the loss/duplicate/delay simulator inline instead of relying on
    /// a separate mediator process (spec §4.5).
    #[arg(long)]
    integrated_impair: bool,

    /// Probability of dropping an inbound datagram (only with --integrated-impair).
    #[arg(long, default_value_t = 0.10)]
    drop: f64,

    /// Probability of duplicating an inbound datagram (only with --integrated-impair).
    #[arg(long, default_value_t = 0.10)]
    dup: f64,

    /// Probability of delaying an inbound datagram (only with --integrated-impair).
    #[arg(long, default_value_t = 0.10)]
    delay: f64,

    #[arg(long, default_value_t = 0.5)]
    delay_min: f64,

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

    fs::create_dir_all(DATA_DIR).context("failed to create data directory")?;

    let socket = UdpSocket::bind(format!("0.0.0.0:{}", cli.port))
        .await
        .with_context(|| format!("failed to bind receiver port {}", cli.port))?;
    info!(port = cli.port, "receiver listening");

    let net_addr: SocketAddr = format!("{}:{}", cli.net.net_host, cli.net.net_port)
        .parse()
        .context("invalid mediator address")?;
    register_with_net(&socket, cli.port, net_addr).await;

    let engine = if cli.integrated_impair {
        let config = ImpairmentConfig {
            p_drop: cli.drop,
            p_dup: cli.dup,
            p_delay: cli.delay,
            min_delay: Duration::from_secs_f64(cli.delay_min),
            max_delay: Duration::from_secs_f64(cli.delay_max),
        };
        Some(match cli.seed {
            Some(seed) => ImpairmentEngine::with_seed(config, seed),
            None => ImpairmentEngine::new(config),
        })
    } else {
        None
    };

    run(socket, cli.port, engine).await
}

async fn register_with_net(socket: &UdpSocket, my_port: u16, net_addr: SocketAddr) {
    let dummy = Packet::control(my_port, 0, 0, 0, 0);
    if let Err(e) = socket.send_to(&dummy.encode(), net_addr).await {
        warn!(%net_addr, error = %e, "failed to register with mediator");
    }
}

async fn run(socket: UdpSocket, my_port: u16, mut engine: Option<ImpairmentEngine>) -> Result<()> {
    let mut table: ConnectionTable<File> = ConnectionTable::new(my_port);
    let mut delay_queue = gbn_impair::DelayQueue::new();
    let mut buf = vec![0u8; gbn_proto::wire::MAX_DATAGRAM_LEN];

    loop {
        let wait = match delay_queue.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(MAX_POLL),
            None => MAX_POLL,
        };

        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, from)) => {
                        let data = bytes::Bytes::copy_from_slice(&buf[..len]);
                        dispatch_inbound(&socket, &mut table, &mut engine, &mut delay_queue, data, from).await;
                    }
                    Err(e) => warn!(error = %e, "recv_from failed"),
                }
            }
            _ = tokio::time::sleep(wait) => {
                for (data, from) in delay_queue.drain_due(Instant::now()) {
                    process_datagram(&socket, &mut table, &data, from).await;
                }
            }
        }
    }
}

/// Applies the integrated impairment trial (if enabled) to one inbound
/// datagram, then forwards it to `process_datagram` zero, one, or two times
/// depending on the outcome.
async fn dispatch_inbound(
    socket: &UdpSocket,
    table: &mut ConnectionTable<File>,
    engine: &mut Option<ImpairmentEngine>,
    delay_queue: &mut gbn_impair::DelayQueue,
    data: bytes::Bytes,
    from: SocketAddr,
) {
    let Some(engine) = engine.as_mut() else {
        process_datagram(socket, table, &data, from).await;
        return;
    };

    match engine.decide() {
        Decision::Drop => debug!(%from, "integrated simulation: dropped"),
        Decision::Duplicate => {
            debug!(%from, "integrated simulation: duplicated");
            process_datagram(socket, table, &data, from).await;
            process_datagram(socket, table, &data, from).await;
        }
        Decision::Delay(delay) => {
            debug!(%from, delay_ms = delay.as_millis(), "integrated simulation: delayed");
            delay_queue.push(Instant::now() + delay, data, from);
        }
        Decision::Forward => process_datagram(socket, table, &data, from).await,
    }
}

async fn process_datagram(
    socket: &UdpSocket,
    table: &mut ConnectionTable<File>,
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

    let reply = if pkt.is_syn() {
        match table.on_syn(&pkt, make_sink) {
            Ok(reply) => {
                info!(peer = pkt.src_port, "connection established");
                Some(reply)
            }
            Err(e) => {
                warn!(peer = pkt.src_port, error = %e, "failed to open output file");
                None
            }
        }
    } else if pkt.is_fin() {
        let reply = table.on_fin(&pkt);
        if reply.is_some() {
            info!(peer = pkt.src_port, "connection closed");
        }
        reply
    } else {
        table.on_data(&pkt)
    };

    if let Some(reply) = reply {
        if let Err(e) = socket.send_to(&reply.encode(), from).await {
            warn!(%from, error = %e, "send failed");
        }
    }
}

fn make_sink(peer_port: u16) -> std::io::Result<File> {
    let path: PathBuf = [DATA_DIR, &format!("{peer_port}.in")].iter().collect();
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
