use axum::body::Body as AxumBody;
use axum::http::Response;

use webhook_relay_core::http::Response as CoreResponse;

/// Convert a core response into one consumable by Axum/Hyper.
pub fn into_axum_response(response: CoreResponse) -> Response<AxumBody> {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, AxumBody::from(body.into_bytes()))
}
