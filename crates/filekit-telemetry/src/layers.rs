//! `x-request-id` handling for the HTTP surface.
//!
//! Apply [`set_request_id_layer`] outside [`propagate_request_id_layer`] so a
//! generated id is echoed on the response as well as a client-supplied one.

use http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Layer assigning a UUID request id when the client did not send one.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER), MakeRequestUuid)
}

/// Layer copying the request id onto the response.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Request, Response};
    use std::convert::Infallible;
    use tower::{ServiceBuilder, ServiceExt};

    async fn echo_id(request: Option<&str>) -> Option<String> {
        let service = ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(propagate_request_id_layer())
            .service_fn(|_req: Request<()>| async { Ok::<_, Infallible>(Response::new(())) });

        let mut builder = Request::builder();
        if let Some(id) = request {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        let response = service
            .oneshot(builder.body(()).ok()?)
            .await
            .ok()?;
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn client_id_is_echoed() {
        assert_eq!(echo_id(Some("abc-123")).await.as_deref(), Some("abc-123"));
    }

    #[tokio::test]
    async fn missing_id_is_generated_and_echoed() {
        let generated = echo_id(None).await;
        assert!(generated.is_some_and(|id| id.len() == 36));
    }
}
