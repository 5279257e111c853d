use serde::Serialize;

use crate::body::Body;
use crate::error::RelayError;
use crate::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    HeaderValue, Response, StatusCode,
};

/// Convert common return types into `Response`.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for Body {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, self)
    }
}

impl IntoResponse for &str {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, Body::text(self))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, Body::text(self))
    }
}

/// Serialises the wrapped value as an `application/json` response.
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match Body::json(&self.0) {
            Ok(body) => json_response(StatusCode::OK, body),
            Err(err) => RelayError::internal(err).into_response(),
        }
    }
}

impl<T> IntoResponse for (StatusCode, T)
where
    T: IntoResponse,
{
    fn into_response(self) -> Response {
        let (status, inner) = self;
        let mut response = inner.into_response();
        *response.status_mut() = status;
        response
    }
}

pub fn response_with_body(status: StatusCode, body: Body) -> Response {
    with_content_type(status, body, "text/plain; charset=utf-8")
}

/// Build a response around a body that already holds encoded JSON.
pub fn json_response(status: StatusCode, body: Body) -> Response {
    with_content_type(status, body, "application/json")
}

fn with_content_type(status: StatusCode, body: Body, content_type: &'static str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;

    if !body.is_empty() {
        let headers = response.headers_mut();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    *response.body_mut() = body;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_with_body_sets_length_and_type() {
        let response = response_with_body(StatusCode::OK, Body::from("hello"));
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
            Some("5")
        );
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn empty_body_does_not_set_length() {
        let response = response_with_body(StatusCode::OK, Body::empty());
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn json_wrapper_sets_content_type() {
        let response = Json(json!({ "status": "ok" })).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(response.body().as_bytes(), br#"{"status":"ok"}"#);
    }

    #[test]
    fn status_code_tuple_overrides_status() {
        let response = (StatusCode::CREATED, "created").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body().as_bytes(), b"created");
    }
}
