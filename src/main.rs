use bridge_core::BridgeConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// MCP server for the Paper-based Analytical Device API
#[derive(Debug, Parser)]
#[command(name = "openbridge", version, about)]
struct Cli {
    /// Transport used to talk to the assistant runtime
    #[arg(value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Configuration file (defaults to OPENBRIDGE_CONFIG or openbridge.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = BridgeConfig::load_from(cli.config.as_deref())?;
    bridge_telemetry::init_telemetry(&config.logging)?;

    let served = match cli.transport {
        Transport::Stdio => openbridge::run_stdio(config).await,
    };
    bridge_telemetry::flush_telemetry();
    served
}
