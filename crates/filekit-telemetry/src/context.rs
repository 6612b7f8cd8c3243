//! Process and request scoped tracing context.
//!
//! The process span is entered once at startup and never left. Per-request
//! identifiers live in a tokio task-local so pipeline and audit code can tag
//! logs without threading the ids through every call.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the process-wide `app` span entered while alive.
///
/// Hold it in `main` for the life of the process; it is not `Send`.
pub struct GlobalContextGuard {
    _entered: Entered<'static>,
}

impl GlobalContextGuard {
    /// Create and enter the `app` span tagged with `service` and the build id.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "app",
            service = %service,
            build_sha = %build_sha()
        )));
        Self {
            _entered: span.enter(),
        }
    }
}

/// Identifiers of the request a task is currently serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

impl RequestContext {
    /// Context for one request.
    #[must_use]
    pub fn new(request_id: impl Into<Arc<str>>, route: impl Into<Arc<str>>) -> Self {
        Self {
            request_id: request_id.into(),
            route: route.into(),
        }
    }

    /// Value of the `x-request-id` header, empty when absent.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Matched route template.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }
}

tokio::task_local! {
    static CURRENT_REQUEST: RequestContext;
}

/// Context of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_request() -> Option<RequestContext> {
    CURRENT_REQUEST.try_with(Clone::clone).ok()
}

/// Request id of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_request_id() -> Option<String> {
    CURRENT_REQUEST
        .try_with(|context| context.request_id().to_string())
        .ok()
}

/// Run `fut` with `request_id` and `route` visible to [`current_request`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext::new(request_id.into(), route.into());
    CURRENT_REQUEST.scope(context, fut).await
}
