use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "webhook-relay", about = "Relay chat messages to a webhook")]
pub struct Args {
    /// Manifest to load (default: ./webhook-relay.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address, overriding `[server].addr`
    #[arg(long)]
    pub addr: Option<SocketAddr>,
}
