//! Facade combining the content archive and the record store.
//!
//! Inserts run on background tasks tracked by the sink, so a slow or
//! unreachable database never holds a response. [`AuditSink::drain`] waits
//! for whatever is still in flight at shutdown.

use std::sync::{Arc, Mutex, PoisonError};

use filekit_telemetry::Metrics;
use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug, warn};

use crate::archive::ContentArchive;
use crate::record::AuditRecord;
use crate::store::AuditStore;

/// Fire-and-forget audit trail used by the request pipeline.
#[derive(Clone)]
pub struct AuditSink {
    archive: ContentArchive,
    store: Arc<dyn AuditStore>,
    metrics: Metrics,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl AuditSink {
    /// Combine an archive and a store.
    #[must_use]
    pub fn new(archive: ContentArchive, store: Arc<dyn AuditStore>, metrics: Metrics) -> Self {
        Self {
            archive,
            store,
            metrics,
            pending: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Snapshot raw content; `None` when the copy could not be written.
    pub async fn snapshot(&self, declared: &str, bytes: &[u8]) -> Option<String> {
        self.archive.snapshot(declared, bytes).await
    }

    /// Attempt one insert and wait for it. A failure is logged, counted and
    /// dropped.
    pub async fn record(&self, record: AuditRecord) {
        insert(self.store.as_ref(), &self.metrics, &record).await;
    }

    /// Queue one insert on a tracked background task and return immediately.
    pub fn dispatch(&self, record: AuditRecord) {
        let store = Arc::clone(&self.store);
        let metrics = self.metrics.clone();
        let task = async move { insert(store.as_ref(), &metrics, &record).await }
            .instrument(Span::current());

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while pending.try_join_next().is_some() {}
        pending.spawn(task);
    }

    /// Number of dispatched inserts that have not been reaped yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait for every dispatched insert to finish.
    pub async fn drain(&self) {
        let mut pending = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let outstanding = pending.len();
        while let Some(joined) = pending.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "audit insert task did not complete");
                self.metrics.inc_audit_failure();
            }
        }
        debug!(outstanding, "audit inserts drained");
    }
}

async fn insert(store: &dyn AuditStore, metrics: &Metrics, record: &AuditRecord) {
    let Err(err) = store.insert(record).await else {
        return;
    };
    warn!(
        error = %err,
        tool_type = record.kind.as_str(),
        "audit record discarded"
    );
    metrics.inc_audit_failure();
}
