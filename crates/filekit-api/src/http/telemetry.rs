//! Request accounting middleware.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use filekit_telemetry::{Metrics, REQUEST_ID_HEADER, with_request_context};

/// Route label for a request: the matched template when routed, the raw path
/// otherwise.
pub(crate) fn route_label<B>(req: &axum::http::Request<B>) -> String {
    req.extensions().get::<MatchedPath>().map_or_else(
        || req.uri().path().to_string(),
        |matched| matched.as_str().to_string(),
    )
}

pub(crate) fn request_id<B>(req: &axum::http::Request<B>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Counts the request under `http_requests_total{route,code}` once the
/// response is known, and runs the handler inside the request context so
/// pipeline logs carry the request id.
pub(crate) async fn track_request(
    State(telemetry): State<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let route = route_label(&request);
    let id = request_id(&request);
    let response = with_request_context(id, route.clone(), next.run(request)).await;
    telemetry.inc_http_request(&route, response.status().as_u16());
    response
}
