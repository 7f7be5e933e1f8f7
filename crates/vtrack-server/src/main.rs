//! Vehicle tracking ingestion server binary.
//!
//! # Usage
//!
//! ```bash
//! vtrack-server --listen-port 6808 --print-mode line
//! ```
//!
//! Every flag also has an environment-variable fallback (see [`Args`]), so
//! the same binary can be configured by a process supervisor without argv
//! manipulation.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vtrack_proto::SpeedUnit;
use vtrack_server::{sink::PrintMode, Server, ServerConfig};

/// Vehicle tracking protocol ingestion server.
#[derive(Parser, Debug)]
#[command(name = "vtrack-server")]
#[command(about = "Telematics ingestion endpoint for JT/T 808-style devices")]
#[command(version)]
struct Args {
    /// TCP port to listen on.
    #[arg(long, env = "VTRACK_LISTEN_PORT", default_value_t = 6808)]
    listen_port: u16,

    /// How decoded events are rendered to stdout.
    #[arg(long, env = "VTRACK_PRINT_MODE", value_enum, default_value_t = PrintMode::Line)]
    print_mode: PrintMode,

    /// Include a hex dump of the offending frame on every parse error.
    #[arg(long, env = "VTRACK_LOG_HEX", default_value_t = false)]
    log_hex: bool,

    /// Authentication token echoed in registration/authentication responses.
    #[arg(long, env = "VTRACK_REGISTER_TOKEN", default_value = "OK")]
    register_token: String,

    /// Treat the ASCII variant's speed field as km/h instead of knots.
    #[arg(long, env = "VTRACK_ASCII_SPEED_KMH", default_value_t = false)]
    ascii_speed_kmh: bool,

    /// Seconds of silence before an idle connection is closed.
    #[arg(long, env = "VTRACK_IDLE_TIMEOUT_SECS", default_value_t = 300)]
    idle_timeout_secs: u64,

    /// Log level passed through to the tracing filter (trace, debug, info,
    /// warn, error).
    #[arg(long, env = "VTRACK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig {
        listen_port: args.listen_port,
        print_mode: args.print_mode,
        log_hex: args.log_hex,
        register_token: args.register_token,
        ascii_speed_unit: if args.ascii_speed_kmh { SpeedUnit::KmPerHour } else { SpeedUnit::Knots },
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
    };

    tracing::info!(port = config.listen_port, print_mode = ?config.print_mode, "vtrack-server starting");

    let server = Server::bind(config).await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run().await?;

    Ok(())
}
