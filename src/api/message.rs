use axum::{
    Extension, Json,
    http::{HeaderMap, StatusCode, header::ORIGIN},
};
use serde_json::Value;

use crate::server::PopupChannel;

/// Receives a popup result and hands it to the bridge, tagged with the
/// origin the browser attached to the request.
pub async fn message(
    headers: HeaderMap,
    Extension(channel): Extension<PopupChannel>,
    Json(data): Json<Value>,
) -> StatusCode {
    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    channel.bus.post(origin, data);
    StatusCode::NO_CONTENT
}

/// Beacon sent by the callback page when its tab goes away.
pub async fn closed(Extension(channel): Extension<PopupChannel>) -> StatusCode {
    channel.opener.mark_closed();
    StatusCode::NO_CONTENT
}
