//! Entry point for `arq-over-sound`.
//!
//! Runs a loopback smoke test: two endpoints in one process, joined by an
//! in-memory link with a configurable fault profile, pushing one payload
//! through the chosen ARQ variant.  All protocol work is delegated to
//! library modules; `main.rs` owns only process setup (logging, argument
//! parsing) and result printing.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use arq_over_sound::channel::memory_link;
use arq_over_sound::config::ArqConfig;
use arq_over_sound::link::{ArqError, GbnLink, SawLink, SendReport};
use arq_over_sound::simulator::{FaultProfile, LossyChannel};

/// Reliable message delivery over a simulated lossy acoustic link.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Stop-and-Wait: one frame in flight at a time.
    Saw(RunOpts),
    /// Go-Back-N: sliding window with cumulative ACKs.
    Gbn(RunOpts),
}

#[derive(Args)]
struct RunOpts {
    /// Payload length in bytes (a repeating text pattern).
    #[arg(long, default_value_t = 130)]
    payload_len: usize,

    /// Payload bytes per DATA frame.
    #[arg(long, default_value_t = 32)]
    max_payload: u8,

    /// Retransmission timeout in milliseconds.
    #[arg(long, default_value_t = 200)]
    timeout_ms: u64,

    /// Go-Back-N window size (ignored by stop-and-wait).
    #[arg(long, default_value_t = 4)]
    window: u8,

    /// Timeout budget before the send fails.
    #[arg(long, default_value_t = 20)]
    max_retries: u32,

    /// One-way link latency in milliseconds.
    #[arg(long, default_value_t = 20)]
    latency_ms: u64,

    /// Probability that a DATA frame is lost.
    #[arg(long, default_value_t = 0.25)]
    drop_data: f64,

    /// Probability that an ACK frame is lost.
    #[arg(long, default_value_t = 0.10)]
    drop_ack: f64,

    /// Probability that a DATA frame arrives corrupted.
    #[arg(long, default_value_t = 0.03)]
    corrupt_data: f64,

    /// Probability that an ACK frame arrives corrupted.
    #[arg(long, default_value_t = 0.01)]
    corrupt_ack: f64,

    /// RNG seed for the fault model (same seed, same run).
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

impl RunOpts {
    fn config(&self) -> ArqConfig {
        ArqConfig {
            max_payload: self.max_payload,
            timeout: Duration::from_millis(self.timeout_ms),
            window: self.window,
            max_retries: self.max_retries,
            ..ArqConfig::default()
        }
    }

    fn profile(&self) -> FaultProfile {
        FaultProfile {
            drop_data: self.drop_data,
            drop_ack: self.drop_ack,
            corrupt_data: self.corrupt_data,
            corrupt_ack: self.corrupt_ack,
        }
    }

    fn payload(&self) -> Vec<u8> {
        b"hello world! "
            .iter()
            .copied()
            .cycle()
            .take(self.payload_len)
            .collect()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let outcome = match cli.mode {
        Mode::Saw(opts) => run_saw(&opts).await,
        Mode::Gbn(opts) => run_gbn(&opts).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("delivery failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_saw(opts: &RunOpts) -> Result<(), String> {
    let payload = opts.payload();
    let (side_a, side_b) = memory_link(Duration::from_millis(opts.latency_ms));
    let mut tx = SawLink::new(
        LossyChannel::new(side_a, opts.profile(), opts.seed),
        opts.config(),
    )
    .map_err(|e| e.to_string())?;
    let mut rx = SawLink::new(
        LossyChannel::new(side_b, opts.profile(), opts.seed.wrapping_add(1)),
        opts.config(),
    )
    .map_err(|e| e.to_string())?;

    // Collect messages until the sender hangs up; duplicates of delivered
    // messages are re-ACKed inside recv_message.
    let receiver = tokio::spawn(async move {
        let mut messages = Vec::new();
        loop {
            match rx.recv_message().await {
                Ok(message) => messages.push(message),
                Err(ArqError::Closed | ArqError::Timeout) => break,
                Err(err) => {
                    log::warn!("receiver stopped: {err}");
                    break;
                }
            }
        }
        messages
    });
    let report = tx.send_message(&payload).await.map_err(|e| e.to_string())?;
    drop(tx); // closes the link so the receiver task winds down

    let received = receiver.await.map_err(|e| e.to_string())?;
    finish("stop-and-wait", &payload, received, &report)
}

async fn run_gbn(opts: &RunOpts) -> Result<(), String> {
    let payload = opts.payload();
    let (side_a, side_b) = memory_link(Duration::from_millis(opts.latency_ms));
    let mut tx = GbnLink::new(
        LossyChannel::new(side_a, opts.profile(), opts.seed),
        opts.config(),
    )
    .map_err(|e| e.to_string())?;
    let mut rx = GbnLink::new(
        LossyChannel::new(side_b, opts.profile(), opts.seed.wrapping_add(1)),
        opts.config(),
    )
    .map_err(|e| e.to_string())?;

    let receiver = tokio::spawn(async move {
        let mut messages = Vec::new();
        loop {
            match rx.recv_message().await {
                Ok(message) => messages.push(message),
                Err(ArqError::Closed | ArqError::Timeout) => break,
                Err(err) => {
                    log::warn!("receiver stopped: {err}");
                    break;
                }
            }
        }
        messages
    });
    let report = tx.send_message(&payload).await.map_err(|e| e.to_string())?;
    drop(tx);

    let received = receiver.await.map_err(|e| e.to_string())?;
    finish("go-back-n", &payload, received, &report)
}

fn finish(
    label: &str,
    payload: &[u8],
    received: Vec<Vec<u8>>,
    report: &SendReport,
) -> Result<(), String> {
    let ok = received.iter().any(|m| m == payload);
    let goodput = if report.duration.as_secs_f64() > 0.0 {
        payload.len() as f64 / report.duration.as_secs_f64()
    } else {
        0.0
    };
    println!(
        "{label}: ok={ok} payload={}B frames={} retries={} data_sent={} \
         max_in_flight={} time={:.2}s goodput={goodput:.1}B/s",
        payload.len(),
        report.frames,
        report.retries,
        report.data_sent,
        report.max_in_flight,
        report.duration.as_secs_f64(),
    );
    if ok {
        Ok(())
    } else {
        Err(format!("{label}: received payload does not match"))
    }
}
