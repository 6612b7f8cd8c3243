//! Caller-facing and internal pipeline errors.

use std::error::Error as StdError;

use filekit_audit::OperationKind;
use filekit_codec::CodecError;
use filekit_storage::StorageError;
use thiserror::Error;

/// The single failure surfaced to callers.
///
/// Missing fields, storage failures and codec failures are not distinguished;
/// `detail` carries the rendered cause chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("processing failed")]
pub struct ProcessingError {
    /// Operation that failed.
    pub operation: OperationKind,
    /// Human-readable description of the underlying failure.
    pub detail: String,
}

impl ProcessingError {
    pub(crate) fn from_step(operation: OperationKind, err: &StepError) -> Self {
        Self {
            operation,
            detail: render_chain(err),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum StepError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },
    #[error("unreadable request body: {detail}")]
    UnreadableBody { detail: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("codec task failed")]
    Blocking {
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Render `err` and its sources as `outer: inner: root`.
pub(crate) fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn chain_includes_every_cause() {
        let err = StepError::Storage(StorageError::Io {
            operation: "stage.write",
            path: "uploads/x".into(),
            source: io::Error::new(io::ErrorKind::StorageFull, "no space left on device"),
        });
        let processing = ProcessingError::from_step(OperationKind::ImageConvert, &err);
        assert_eq!(processing.to_string(), "processing failed");
        assert_eq!(
            processing.detail,
            "storage io failure: no space left on device"
        );
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = StepError::MissingField { field: "file" };
        assert_eq!(render_chain(&err), "missing required field 'file'");
    }
}
