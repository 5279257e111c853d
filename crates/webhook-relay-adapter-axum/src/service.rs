use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body as AxumBody;
use axum::http::{Request, Response};
use tokio::{runtime::Handle, task};
use tower::Service;

use webhook_relay_core::config::{ConfigHandle, ConfigProvider, EnvConfig};
use webhook_relay_core::proxy::{ProxyClient, ProxyHandle};
use webhook_relay_core::response::IntoResponse;
use webhook_relay_core::router::RouterService;

use crate::proxy::ReqwestProxyClient;
use crate::request::into_core_request;
use crate::response::into_axum_response;

/// Tower service that runs relay router requests on Axum/Hyper.
///
/// Every request gets the shared upstream client and configuration provider in its
/// extensions. Defaults are `ReqwestProxyClient` and the process environment.
#[derive(Clone)]
pub struct RelayAxumService {
    router: RouterService,
    proxy: ProxyHandle,
    config: ConfigHandle,
}

impl RelayAxumService {
    pub fn new(router: RouterService) -> Self {
        Self {
            router,
            proxy: ProxyHandle::with_client(ReqwestProxyClient::default()),
            config: ConfigHandle::with_provider(EnvConfig),
        }
    }

    #[must_use]
    pub fn with_proxy_client<C>(mut self, client: C) -> Self
    where
        C: ProxyClient + 'static,
    {
        self.proxy = ProxyHandle::with_client(client);
        self
    }

    #[must_use]
    pub fn with_config_provider<P>(mut self, provider: P) -> Self
    where
        P: ConfigProvider + 'static,
    {
        self.config = ConfigHandle::with_provider(provider);
        self
    }
}

impl Service<Request<AxumBody>> for RelayAxumService {
    type Response = Response<AxumBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<AxumBody>) -> Self::Future {
        let router = self.router.clone();
        let proxy = self.proxy.clone();
        let config = self.config.clone();
        Box::pin(async move {
            let mut core_request = match into_core_request(request).await {
                Ok(req) => req,
                Err(err) => {
                    log::error!("failed to convert request: {err}");
                    return Ok(into_axum_response(err.into_response()));
                }
            };

            core_request.extensions_mut().insert(proxy);
            core_request.extensions_mut().insert(config);

            // Core handler futures are not `Send`; drive them on this worker thread.
            let core_response = task::block_in_place(move || {
                Handle::current().block_on(router.oneshot(core_request))
            });
            Ok(into_axum_response(core_response))
        })
    }
}
