#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Process configuration for filekit, read once from the environment at startup.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (environment parsing),
//! `error.rs` (`ConfigError`).

pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    CodecSettings, DatabaseSettings, HttpSettings, LogFormatSetting, ServiceConfig,
    StorageSettings,
};
