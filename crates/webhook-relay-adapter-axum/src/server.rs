use std::net::{SocketAddr, TcpListener as StdTcpListener};

use anyhow::Context;
use axum::Router;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::signal;
use tower::{service_fn, Service};

use webhook_relay_core::app::Hooks;
use webhook_relay_core::manifest::{Manifest, ManifestLogging};

use crate::service::RelayAxumService;

/// Address and shutdown behaviour of a `RelayServer`.
#[derive(Clone)]
pub struct RelayServerConfig {
    pub addr: SocketAddr,
    pub enable_ctrl_c: bool,
}

impl Default for RelayServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            enable_ctrl_c: true,
        }
    }
}

/// Blocking HTTP server hosting a `RelayAxumService`.
pub struct RelayServer {
    service: RelayAxumService,
    config: RelayServerConfig,
}

impl RelayServer {
    pub fn new(service: RelayAxumService) -> Self {
        Self {
            service,
            config: RelayServerConfig::default(),
        }
    }

    pub fn with_config(service: RelayAxumService, config: RelayServerConfig) -> Self {
        Self { service, config }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let runtime = RuntimeBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;

        runtime.block_on(async move { self.run_async().await })
    }

    pub async fn run_async(self) -> anyhow::Result<()> {
        let listener = StdTcpListener::bind(self.config.addr)
            .with_context(|| format!("failed to bind relay server to {}", self.config.addr))?;
        listener
            .set_nonblocking(true)
            .context("failed to set listener to non-blocking")?;

        let listener = tokio::net::TcpListener::from_std(listener)
            .context("failed to adopt std listener into tokio")?;

        self.serve(listener).await
    }

    /// Serve on an already-bound listener. Requires a multi-threaded Tokio runtime.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        let RelayServer { service, config } = self;

        if let Ok(addr) = listener.local_addr() {
            log::info!("webhook relay listening on http://{addr}");
        }

        let router = Router::new().fallback_service(service_fn(move |req| {
            let mut svc = service.clone();
            async move { svc.call(req).await }
        }));

        let server = axum::serve(listener, router);
        if config.enable_ctrl_c {
            server
                .with_graceful_shutdown(async {
                    let _ = signal::ctrl_c().await;
                    log::info!("shutdown signal received");
                })
                .await
                .context("axum server error")?;
        } else {
            server.await.context("axum server error")?;
        }

        Ok(())
    }
}

/// Install `simple_logger` at the manifest's level. Repeated calls are ignored.
pub fn init_logging(logging: &ManifestLogging) {
    let level: LevelFilter = logging.level_filter();
    SimpleLogger::new().with_level(level).init().ok();
}

/// Build `A` from the manifest and serve it until interrupted.
///
/// The webhook URL is read from the environment variable named by `[relay].webhook_env`
/// on every request.
pub fn run_app<A: Hooks>(manifest: &Manifest) -> anyhow::Result<()> {
    init_logging(&manifest.logging);

    let settings = manifest.relay_settings();
    let app = A::build_app(&settings);
    log::info!(
        "{} relaying {} to ${}",
        app.name(),
        settings.path,
        settings.webhook_env
    );

    let service = RelayAxumService::new(app.into_router());
    let config = RelayServerConfig {
        addr: manifest.server.addr,
        enable_ctrl_c: true,
    };
    RelayServer::with_config(service, config).run()
}
