#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! filekit application wiring.
//!
//! Layout: `bootstrap.rs` (startup and shutdown sequence), `error.rs`
//! (`AppError`).

/// Application bootstrap and shutdown.
pub mod bootstrap;
/// Fatal startup errors.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
