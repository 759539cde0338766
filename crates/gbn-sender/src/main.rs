//! Sender daemon: handshake, Go-Back-N data transfer, teardown.
//!
//! Single-threaded event loop around one UDP socket connected to the
//! mediator — every send and the handshake/retransmit timers are driven
//! from one task, matching the receiver and mediator's concurrency model.

mod transfer;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use gbn_common::{GbnError, NetTarget};
use gbn_proto::wire::{flags, Packet};
use gbn_proto::chunk::Chunks;
use gbn_proto::START_SEQ;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{info, warn};

use transfer::Window;

const HANDSHAKE_BUDGET: Duration = Duration::from_secs(10);
const RETRY_TIMEOUT: Duration = Duration::from_millis(500);
const DATA_POLL_TIMEOUT: Duration = Duration::from_millis(50);
const DATA_RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(500);
const TEARDOWN_ATTEMPTS: u32 = 5;

#[derive(Debug, Parser)]
#[command(about = "Sender daemon: streams a file over the Go-Back-N protocol")]
struct Cli {
    /// File to transfer.
    filename: PathBuf,

    #[command(flatten)]
    net: NetTarget,

    /// Virtual port of the receiver.
    #[arg(long, default_value_t = 9999)]
    server_port: u16,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    gbn_common::init_tracing(cli.verbose);

    let data = std::fs::read(&cli.filename).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GbnError::FileNotFound(cli.filename.clone())
        } else {
            GbnError::Io(e)
        }
    })?;

    let net_addr: SocketAddr = format!("{}:{}", cli.net.net_host, cli.net.net_port)
        .parse()
        .context("invalid mediator address")?;

    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind ephemeral port")?;
    socket.connect(net_addr).await.context("failed to connect to mediator")?;
    let src_port = socket.local_addr()?.port();
    info!(src_port, %net_addr, server_port = cli.server_port, "sender starting");

    let start_seq = perform_handshake(&socket, src_port, cli.server_port).await?;
    info!(start_seq, "handshake complete");

    let final_seq = transmit_file(&socket, src_port, cli.server_port, &data, start_seq).await?;
    info!(final_seq, "file transmission complete");

    perform_teardown(&socket, src_port, cli.server_port, final_seq).await;

    Ok(())
}

async fn recv_packet(socket: &UdpSocket, bound: Duration) -> Option<Packet> {
    let mut buf = vec![0u8; gbn_proto::wire::MAX_DATAGRAM_LEN];
    match timeout(bound, socket.recv(&mut buf)).await {
        Ok(Ok(len)) => Packet::decode(&buf[..len]).ok(),
        _ => None,
    }
}

async fn send_packet(socket: &UdpSocket, pkt: &Packet) {
    if let Err(e) = socket.send(&pkt.encode()).await {
        warn!(error = %e, "send failed");
    }
}

async fn perform_handshake(socket: &UdpSocket, src_port: u16, dst_port: u16) -> Result<u32, GbnError> {
    let syn = Packet::control(src_port, dst_port, START_SEQ, 0, flags::SYN);
    let deadline = Instant::now() + HANDSHAKE_BUDGET;

    loop {
        if Instant::now() >= deadline {
            return Err(GbnError::HandshakeTimeout);
        }
        send_packet(socket, &syn).await;

        if let Some(resp) = recv_packet(socket, RETRY_TIMEOUT).await {
            if resp.has_flags(flags::SYN | flags::ACK) && resp.ack == START_SEQ + 1 {
                return Ok(resp.ack);
            }
        }
        warn!("timeout waiting for SYN-ACK, retrying");
    }
}

async fn transmit_file(
    socket: &UdpSocket,
    src_port: u16,
    dst_port: u16,
    data: &[u8],
    start_seq: u32,
) -> Result<u32> {
    let chunks = Chunks::new(data, start_seq);
    let total = chunks.len();
    let mut window = Window::new(chunks, start_seq, Instant::now());

    while !window.is_complete() {
        while let Some((seq, payload)) = window.next_to_send() {
            let pkt = Packet::data(src_port, dst_port, seq, payload);
            send_packet(socket, &pkt).await;
            info!(seq, total, "sent segment");
        }

        if let Some(resp) = recv_packet(socket, DATA_POLL_TIMEOUT).await {
            if resp.is_ack() && window.on_ack(resp.ack, Instant::now()) {
                info!(ack = resp.ack, "window advanced");
            }
        }

        if window.timed_out(Instant::now(), DATA_RETRANSMIT_TIMEOUT) {
            warn!("retransmit timeout — going back to base of window");
            window.retransmit_reset(Instant::now());
        }
    }

    Ok(window.base_seq())
}

async fn perform_teardown(socket: &UdpSocket, src_port: u16, dst_port: u16, final_seq: u32) {
    let fin = Packet::control(src_port, dst_port, final_seq, 0, flags::FIN);

    for attempt in 1..=TEARDOWN_ATTEMPTS {
        send_packet(socket, &fin).await;
        if let Some(resp) = recv_packet(socket, RETRY_TIMEOUT).await {
            if resp.is_ack() && resp.ack == final_seq + 1 {
                info!("FIN acked");
                return;
            }
        }
        warn!(attempt, "no FIN-ACK yet");
    }
    warn!("teardown exhausted retries, closing anyway");
}
