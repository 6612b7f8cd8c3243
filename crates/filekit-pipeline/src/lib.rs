#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Per-request orchestration: snapshot for audit, stage, transform, emit, and
//! a structured audit insert that runs whatever the outcome.

pub mod error;
pub mod model;
pub mod service;

pub use error::ProcessingError;
pub use filekit_audit::OperationKind;
pub use model::{Artifact, Disposition, OperationRequest, Upload};
pub use service::RequestPipeline;
