//! `webhook-relay` binary: loads the manifest and serves the relay with Axum.

mod args;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use webhook_relay_adapter_axum::run_app;
use webhook_relay_core::app::RelayApp;
use webhook_relay_core::manifest::{Manifest, ManifestLoader, DEFAULT_MANIFEST_FILE};

use crate::args::Args;

fn main() {
    if let Err(err) = run() {
        eprintln!("webhook-relay failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut manifest = load_manifest(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        manifest.server.addr = addr;
    }
    run_app::<RelayApp>(&manifest)
}

/// An explicit `--config` must exist; the default manifest file is optional.
fn load_manifest(config: Option<&Path>) -> anyhow::Result<Manifest> {
    let loader = match config {
        Some(path) => ManifestLoader::from_path(path)
            .with_context(|| format!("failed to load manifest {}", path.display()))?,
        None => {
            let default_path = Path::new(DEFAULT_MANIFEST_FILE);
            if default_path.exists() {
                ManifestLoader::from_path(default_path).with_context(|| {
                    format!("failed to load manifest {}", default_path.display())
                })?
            } else {
                ManifestLoader::default()
            }
        }
    };
    Ok(Arc::unwrap_or_clone(loader.into_manifest()))
}
