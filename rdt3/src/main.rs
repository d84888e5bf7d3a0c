//! Entry point for `rdt3`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, signal handling, argument parsing).

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;

use rdt3::config::{DEFAULT_HOST, DEFAULT_PORT};
use rdt3::simulator::{FaultModel, Impairment, ImpairmentConfig};
use rdt3::throughput::Meter;
use rdt3::timer::RttConfig;
use rdt3::{Client, ClientConfig, Server, ServerConfig, Sink};

const SAMPLE_MESSAGES: [&str; 3] = [
    "The quick brown fox jumps over the lazy dog.",
    "Stop and wait: one packet in flight, one bit of sequence space.",
    "Every payload is delivered exactly once, in order.",
];

/// Reliable stop-and-wait (RDT 3.0) transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Receive and print messages, acknowledging each one.
    Server {
        /// Address to bind.
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Probability of dropping an outgoing ACK.
        #[arg(long, default_value_t = 0.1)]
        loss: f64,
        /// Probability of corrupting one byte of an outgoing ACK.
        #[arg(long, default_value_t = 0.1)]
        corrupt: f64,
        /// Seed the fault model for a reproducible run.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Send messages to a server, one at a time.
    Client {
        /// Server host name or address.
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// EWMA weight of a new RTT sample.
        #[arg(long, default_value_t = 0.125)]
        alpha: f64,
        /// EWMA weight of a new RTT deviation.
        #[arg(long, default_value_t = 0.25)]
        beta: f64,
        /// Timeout in seconds before the first RTT sample.
        #[arg(long, default_value_t = 1.0)]
        timeout: f64,
        /// Probability of dropping an outgoing data packet.
        #[arg(long, default_value_t = 0.1)]
        loss: f64,
        /// Probability of corrupting one byte of an outgoing data packet.
        #[arg(long, default_value_t = 0.1)]
        corrupt: f64,
        /// Seed the fault model for a reproducible run.
        #[arg(long)]
        seed: Option<u64>,
        /// Give up on a message after this many transmissions.
        #[arg(long)]
        max_transmissions: Option<u32>,
        /// Pause between messages, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        pause_ms: u64,
        /// Messages to send; a few sample sentences if none are given.
        messages: Vec<String>,
    },
}

/// Logs each delivered payload as (lossy) UTF-8.
struct LogSink;

impl Sink for LogSink {
    fn deliver(&mut self, payload: Vec<u8>) {
        log::info!("[server] delivered: {}", String::from_utf8_lossy(&payload));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG overrides; info shows deliveries, RTT samples and timeouts.
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Server {
            host,
            port,
            loss,
            corrupt,
            seed,
        } => {
            let config = ServerConfig {
                host,
                port,
                impairment: ImpairmentConfig {
                    loss_rate: loss,
                    corrupt_rate: corrupt,
                },
            };
            match seed {
                Some(seed) => {
                    let faults = Impairment::seeded(config.impairment, seed);
                    run_server(Server::bind_with(config, faults).await?).await
                }
                None => run_server(Server::bind(config).await?).await,
            }
        }
        Mode::Client {
            host,
            port,
            alpha,
            beta,
            timeout,
            loss,
            corrupt,
            seed,
            max_transmissions,
            pause_ms,
            messages,
        } => {
            let initial_timeout = Duration::try_from_secs_f64(timeout)
                .with_context(|| format!("invalid timeout {timeout}"))?;
            let config = ClientConfig {
                host,
                port,
                rtt: RttConfig {
                    alpha,
                    beta,
                    initial_timeout,
                },
                impairment: ImpairmentConfig {
                    loss_rate: loss,
                    corrupt_rate: corrupt,
                },
                max_transmissions,
            };
            let messages = if messages.is_empty() {
                SAMPLE_MESSAGES.iter().map(|m| m.to_string()).collect()
            } else {
                messages
            };
            let pause = Duration::from_millis(pause_ms);

            match seed {
                Some(seed) => {
                    let faults = Impairment::seeded(config.impairment, seed);
                    let client = Client::connect_with(config, faults).await?;
                    run_client(client, &messages, pause).await
                }
                None => run_client(Client::connect(config).await?, &messages, pause).await,
            }
        }
    }
}

async fn run_server<F: FaultModel>(mut server: Server<F>) -> Result<()> {
    let mut sink = LogSink;
    tokio::select! {
        res = server.serve(&mut sink) => res.context("server stopped"),
        _ = tokio::signal::ctrl_c() => {
            log::info!("[server] interrupted; shutting down");
            Ok(())
        }
    }
}

async fn run_client<F: FaultModel>(
    mut client: Client<F>,
    messages: &[String],
    pause: Duration,
) -> Result<()> {
    log::info!(
        "[client] {} → {}",
        client.local_addr(),
        client.server_addr()
    );
    let mut meter = Meter::start();

    for (i, message) in messages.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let report = client
            .send(message.as_bytes())
            .await
            .with_context(|| format!("sending message {}", i + 1))?;
        meter.record(message.len());
        log::info!(
            "[client] message {} acknowledged (seq={}, {} transmission(s))",
            i + 1,
            report.seq,
            report.transmissions
        );
    }

    log::info!("[client] throughput: {}", meter.finish());
    Ok(())
}
