#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Best-effort audit trail for filekit operations.
//!
//! Two independent failure domains: a raw-content archive directory that
//! receives a byte-identical copy of every upload, and an append-only
//! `activity_log` table. Neither ever fails the request that feeds it.
//!
//! Layout: `record.rs` (audit record model), `archive.rs` (raw snapshots),
//! `store.rs` (`AuditStore` seam and its Postgres and log-only
//! implementations), `sink.rs` (the combined facade used by the pipeline).

pub mod archive;
pub mod error;
pub mod record;
pub mod sink;
pub mod store;

pub use archive::{ContentArchive, archive_file_name};
pub use error::{AuditError, AuditResult};
pub use record::{ArchiveRef, AuditRecord, NOT_ARCHIVED, OperationKind};
pub use sink::AuditSink;
pub use store::{AuditStore, DisabledAuditStore, PgAuditStore, store_from_settings};
