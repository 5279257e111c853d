use std::future::Future;
use std::pin::Pin;

use crate::body::Body;
use crate::error::RelayError;

pub use http::header;
pub use http::request::Builder as RequestBuilder;

pub type Method = http::Method;
pub type StatusCode = http::StatusCode;
pub type HeaderMap = http::HeaderMap;
pub type HeaderValue = http::HeaderValue;
pub type Uri = http::Uri;

pub fn request_builder() -> RequestBuilder {
    http::Request::builder()
}

pub type Request = http::Request<Body>;
pub type Response = http::Response<Body>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, RelayError>> + 'static>>;
