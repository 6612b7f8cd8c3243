#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! HTTP surface for filekit: the four operation endpoints, static SEO
//! documents, health and Prometheus metrics.
//!
//! Layout: `error.rs` (`ApiServerError`), `http/router.rs` (server host and layers), `http/operations.rs`
//! (form parsing and artifact responses), `http/errors.rs` (JSON error body),
//! `http/telemetry.rs` (request accounting middleware), `http/health.rs`,
//! `http/seo.rs`, `state.rs` (shared handler state).

pub mod error;
pub mod http;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
