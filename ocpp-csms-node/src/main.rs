//! OCPP CSMS Node - CLI for the OCPP 1.6 central system
//!
//! # Usage
//!
//! ```bash
//! # Listen on 0.0.0.0:3002
//! ocpp-csms-node
//!
//! # Custom port, OCPP-J compliant replies
//! ocpp-csms-node --port 9000 --reply-format standard
//!
//! # Refuse charge points that do not offer ocpp1.6
//! ocpp-csms-node --strict-subprotocol
//! ```

use std::net::IpAddr;

use clap::Parser;
use ocpp_csms::{ReplyFormat, Server, ServerConfig, DEFAULT_PORT, OCPP16_SUBPROTOCOL};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// OCPP 1.6 central system accepting charge point WebSocket connections
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// WebSocket subprotocol to negotiate
    #[arg(long, default_value = OCPP16_SUBPROTOCOL)]
    subprotocol: String,

    /// Heartbeat interval (seconds) reported to charge points
    #[arg(long, default_value = "300")]
    heartbeat_interval: u32,

    /// Reply shape: echo (4-element) or standard (OCPP-J)
    #[arg(long, default_value = "echo")]
    reply_format: ReplyFormat,

    /// Reject handshakes that do not offer the subprotocol
    #[arg(long)]
    strict_subprotocol: bool,

    /// Largest inbound message (bytes); bigger ones close the connection
    #[arg(long, default_value = "65536")]
    max_message_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ServerConfig::new((args.bind, args.port).into())
        .with_subprotocol(&args.subprotocol)
        .with_heartbeat_interval(args.heartbeat_interval)
        .with_reply_format(args.reply_format)
        .with_max_message_size(args.max_message_size);

    if args.strict_subprotocol {
        config = config.strict();
    }

    info!(
        "Starting OCPP central system (subprotocol {}, replies {:?})",
        config.subprotocol, config.reply_format
    );

    let server = Server::bind(config).await?;
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Stopped");
    Ok(())
}
