//! The chat relay: validates a `GET ?message=` request, forwards the message to the configured
//! webhook and hands the webhook's JSON reply back unchanged.

use std::sync::Arc;

use serde::de::IgnoredAny;

use crate::body::Body;
use crate::context::RequestContext;
use crate::error::{RelayError, UpstreamError};
use crate::handler::IntoHandler;
use crate::http::{header::ACCEPT, HeaderValue, Method, Response, StatusCode, Uri};
use crate::manifest::RelaySettings;
use crate::proxy::{ProxyHandle, ProxyRequest};
use crate::response::json_response;

pub const MESSAGE_PARAM: &str = "message";

/// Build the relay handler for the configuration key named in `settings`.
pub fn relay_handler(settings: &RelaySettings) -> impl IntoHandler {
    let webhook_env: Arc<str> = Arc::from(settings.webhook_env.as_str());
    move |ctx: RequestContext| {
        let webhook_env = Arc::clone(&webhook_env);
        async move { relay(ctx, &webhook_env).await }
    }
}

/// Checks run in a fixed order: method, then configuration, then the `message` parameter.
pub async fn relay(ctx: RequestContext, webhook_env: &str) -> Result<Response, RelayError> {
    if ctx.method() != Method::GET {
        return Err(RelayError::method_not_allowed(ctx.method()));
    }

    let webhook_url = ctx
        .config_handle()
        .and_then(|config| config.get(webhook_env))
        .ok_or_else(|| RelayError::configuration_missing(webhook_env))?;

    let message = ctx
        .query_param(MESSAGE_PARAM)
        .ok()
        .flatten()
        .filter(|message| !message.is_empty())
        .ok_or_else(RelayError::missing_message)?;

    let outcome = match ctx.proxy_handle() {
        Some(proxy) => forward_message(&proxy, &webhook_url, &message).await,
        None => Err(UpstreamError::transport(anyhow::anyhow!(
            "no upstream client installed for this request"
        ))),
    };

    match outcome {
        Ok(body) => Ok(json_response(StatusCode::OK, body)),
        Err(err) => {
            log::error!("webhook relay error: {}", err);
            Err(err.into())
        }
    }
}

/// `<webhook_url>?message=<form-encoded message>`; the base URL is used as given.
pub fn outbound_uri(webhook_url: &str, message: &str) -> Result<Uri, UpstreamError> {
    let query =
        serde_urlencoded::to_string([(MESSAGE_PARAM, message)]).map_err(UpstreamError::transport)?;
    format!("{}?{}", webhook_url, query)
        .parse::<Uri>()
        .map_err(|source| UpstreamError::InvalidUrl {
            url: webhook_url.to_string(),
            source,
        })
}

/// Issue the single outbound call. Success means a 2xx status and a well-formed JSON body; the
/// body bytes are returned untouched.
pub async fn forward_message(
    proxy: &ProxyHandle,
    webhook_url: &str,
    message: &str,
) -> Result<Body, UpstreamError> {
    let mut request = ProxyRequest::get(outbound_uri(webhook_url, message)?);
    request
        .headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("application/json"));

    let response = proxy.send(request).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status { status });
    }

    let body = response.into_body();
    serde_json::from_slice::<IgnoredAny>(body.as_bytes())
        .map_err(|source| UpstreamError::InvalidJson { source })?;
    Ok(body)
}
