use anyhow::anyhow;
use axum::body::Body as AxumBody;
use axum::http::Request;

use webhook_relay_core::body::Body;
use webhook_relay_core::error::RelayError;
use webhook_relay_core::http::Request as CoreRequest;

/// Convert an Axum/Hyper request into a core request with a fully buffered body.
///
/// Handles for the upstream client and configuration are installed by `RelayAxumService`.
pub async fn into_core_request(request: Request<AxumBody>) -> Result<CoreRequest, RelayError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|err| RelayError::internal(anyhow!("failed to read request body: {err}")))?;
    Ok(CoreRequest::from_parts(parts, Body::from_bytes(bytes)))
}
