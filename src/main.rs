//! `a2a-mesh` binary: runs the A2A agent registry.

use a2a_mesh::a2a::server;
use a2a_mesh::config::Settings;
use a2a_mesh::logging;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "a2a-mesh", version, about = "A2A agent registry and discovery service")]
struct Cli {
    /// Optional TOML settings file, layered over defaults and under `A2A__*` env vars.
    #[arg(long, env = "A2A_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the agent registry.
    Registry {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Externally reachable base URL advertised in the registry's card.
        #[arg(long)]
        public_url: Option<String>,

        /// Seconds of inactivity before a registered agent expires.
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Registry {
            host,
            port,
            public_url,
            ttl_secs,
        } => {
            if let Some(host) = host {
                settings.registry.host = host;
            }
            if let Some(port) = port {
                settings.registry.port = port;
            }
            if public_url.is_some() {
                settings.registry.public_url = public_url;
            }
            if let Some(ttl) = ttl_secs {
                settings.registry.agent_ttl_secs = ttl;
            }
            server::serve_registry(&settings.registry).await
        }
    }
}
