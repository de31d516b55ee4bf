//! Request correlation.
//!
//! Each request runs inside a `request` span keyed by a request id. An id
//! supplied by the caller (a proxy or load balancer) in `x-request-id` is
//! kept when it looks sane; otherwise a UUID v4 is minted. The id is echoed
//! back on the response so clients can quote it in bug reports.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id we accept
const MAX_INCOMING_ID_LEN: usize = 128;

/// The id of the request being handled, stored in request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    fn for_request(headers: &HeaderMap) -> Self {
        incoming_id(headers)
            .map(|id| RequestId(id.to_string()))
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string()))
    }
}

/// A caller-supplied id, if it is short visible ASCII
fn incoming_id(headers: &HeaderMap) -> Option<&str> {
    let id = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let acceptable = !id.is_empty()
        && id.len() <= MAX_INCOMING_ID_LEN
        && id.bytes().all(|b| b.is_ascii_graphic());
    acceptable.then_some(id)
}

/// Outermost layer: wraps everything below it in the request span and logs
/// one completion event per request.
pub async fn request_id_layer(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::for_request(request.headers());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id.0,
        method = %request.method(),
        path = %request.uri().path(),
        duration_ms = tracing::field::Empty,
    );
    request.extensions_mut().insert(request_id.clone());

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    span.record("duration_ms", duration_ms);
    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms,
            "Request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
