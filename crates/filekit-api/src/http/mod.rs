//! HTTP surface modules (router, handlers, middleware).

/// JSON error responses.
pub(crate) mod errors;
/// Health and metrics endpoints.
pub(crate) mod health;
/// Operation endpoints backed by the request pipeline.
pub(crate) mod operations;
/// Router construction and server host.
pub mod router;
/// Crawler-facing static documents.
pub(crate) mod seo;
/// Request counting and context middleware.
pub(crate) mod telemetry;
