use serde::de::DeserializeOwned;

use crate::body::Body;
use crate::config::ConfigHandle;
use crate::error::RelayError;
use crate::http::{Method, Request};
use crate::proxy::ProxyHandle;

/// Request context exposed to handlers and middleware.
pub struct RequestContext {
    request: Request,
}

impl RequestContext {
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn body(&self) -> &Body {
        self.request.body()
    }

    /// Decoded `key=value` pairs of the query string, in order of appearance.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, RelayError> {
        self.query()
    }

    /// First decoded value for `name`, if the query string carries it.
    pub fn query_param(&self, name: &str) -> Result<Option<String>, RelayError> {
        Ok(self
            .query_pairs()?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value))
    }

    pub fn query<T>(&self) -> Result<T, RelayError>
    where
        T: DeserializeOwned,
    {
        let query = self.request.uri().query().unwrap_or("");
        serde_urlencoded::from_str(query)
            .map_err(|err| RelayError::bad_request(format!("invalid query string: {}", err)))
    }

    pub fn proxy_handle(&self) -> Option<ProxyHandle> {
        self.request.extensions().get::<ProxyHandle>().cloned()
    }

    pub fn config_handle(&self) -> Option<ConfigHandle> {
        self.request.extensions().get::<ConfigHandle>().cloned()
    }
}
