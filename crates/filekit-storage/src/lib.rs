#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Working storage namespace and the retention janitor that bounds it.
//!
//! The namespace is deliberately unsynchronised: request handlers and the
//! janitor operate on the same directory without locks, and an entry older
//! than the retention threshold may disappear at any time.

pub mod error;
pub mod janitor;
pub mod working;

pub use error::{StorageError, StorageResult};
pub use janitor::{JanitorHandle, RetentionJanitor, SweepReport, sweep_expired};
pub use working::{StagedEntry, WorkingStorage, sanitize_file_name};
