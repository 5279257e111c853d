use async_trait::async_trait;
use reqwest::Client;
use webhook_relay_core::body::Body;
use webhook_relay_core::error::UpstreamError;
use webhook_relay_core::proxy::{ProxyClient, ProxyRequest, ProxyResponse};

/// `ProxyClient` backed by a shared `reqwest::Client`.
///
/// No timeout is configured: the relay waits for the webhook for as long as it takes.
#[derive(Clone)]
pub struct ReqwestProxyClient {
    client: Client,
}

impl ReqwestProxyClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestProxyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl ProxyClient for ReqwestProxyClient {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, UpstreamError> {
        let (method, uri, headers) = request.into_parts();

        let response = self
            .client
            .request(method, uri.to_string())
            .headers(headers)
            .send()
            .await
            .map_err(UpstreamError::transport)?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(UpstreamError::transport)?;

        let mut proxy_response = ProxyResponse::new(status, Body::from(bytes));
        *proxy_response.headers_mut() = headers;
        Ok(proxy_response)
    }
}
