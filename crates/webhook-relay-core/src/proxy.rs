use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::body::Body;
use crate::error::UpstreamError;
use crate::http::{HeaderMap, Method, StatusCode, Uri};

/// Outbound request description for a webhook call.
pub struct ProxyRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl ProxyRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn into_parts(self) -> (Method, Uri, HeaderMap) {
        (self.method, self.uri, self.headers)
    }
}

impl fmt::Debug for ProxyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .finish()
    }
}

/// Buffered reply from the webhook, status untouched.
pub struct ProxyResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, body: Body) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }
}

impl fmt::Debug for ProxyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResponse")
            .field("status", &self.status)
            .field("body", &self.body)
            .finish()
    }
}

/// Transport used for the outbound webhook call.
///
/// Implementations return `Err` only when no HTTP response was obtained (DNS, refused
/// connection, broken body). Non-success statuses are returned as `Ok` and judged by the caller.
#[async_trait(?Send)]
pub trait ProxyClient: Send + Sync {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, UpstreamError>;
}

/// Shared handle to a `ProxyClient`, carried in request extensions by the hosting adapter.
#[derive(Clone)]
pub struct ProxyHandle {
    client: Arc<dyn ProxyClient>,
}

impl ProxyHandle {
    pub fn with_client<C>(client: C) -> Self
    where
        C: ProxyClient + 'static,
    {
        Self {
            client: Arc::new(client),
        }
    }

    pub async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, UpstreamError> {
        self.client.send(request).await
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle").finish_non_exhaustive()
    }
}
