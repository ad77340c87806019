//! Background audit trail writer.
//!
//! Handlers hand entries to an [`AuditSink`] and move on. A single worker
//! task drains the queue into storage and periodically purges entries older
//! than the retention window. Failed writes are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use erx_persistence::core::AuditStorage;
use erx_persistence::types::AuditEntry;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Queue capacity before new entries are dropped.
pub const AUDIT_QUEUE_CAPACITY: usize = 1024;

/// How often expired entries are purged.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

enum AuditMessage {
    Record(Box<AuditEntry>),
    Flush(oneshot::Sender<()>),
}

/// Handle used by request handlers to append audit entries.
#[derive(Debug, Clone)]
pub struct AuditSink {
    sender: mpsc::Sender<AuditMessage>,
}

impl std::fmt::Debug for AuditMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditMessage::Record(entry) => f.debug_tuple("Record").field(&entry.action).finish(),
            AuditMessage::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl AuditSink {
    /// Starts the worker task and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S>(storage: Arc<S>, retention_days: u32) -> Self
    where
        S: AuditStorage + ?Sized + 'static,
    {
        let (sender, receiver) = mpsc::channel(AUDIT_QUEUE_CAPACITY);
        tokio::spawn(async move {
            Self::worker(receiver, storage, retention_days).await;
        });
        Self { sender }
    }

    /// Queues an entry. Never blocks; a full or closed queue drops the entry.
    pub fn record(&self, entry: AuditEntry) {
        let action = entry.action;
        if let Err(e) = self.sender.try_send(AuditMessage::Record(Box::new(entry))) {
            warn!(%action, error = %e, "Dropping audit entry");
        }
    }

    /// Waits until every entry queued before this call has been written.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(AuditMessage::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn worker<S>(
        mut receiver: mpsc::Receiver<AuditMessage>,
        storage: Arc<S>,
        retention_days: u32,
    ) where
        S: AuditStorage + ?Sized,
    {
        let mut sweep = tokio::time::interval(PURGE_INTERVAL);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = receiver.recv() => match message {
                    Some(AuditMessage::Record(entry)) => {
                        let action = entry.action;
                        match storage.append_audit(*entry).await {
                            Ok(id) => debug!(%action, %id, "Audit entry written"),
                            Err(e) => warn!(%action, error = %e, "Failed to write audit entry"),
                        }
                    }
                    Some(AuditMessage::Flush(done)) => {
                        let _ = done.send(());
                    }
                    None => {
                        debug!("Audit queue closed, stopping worker");
                        return;
                    }
                },
                _ = sweep.tick() => {
                    let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
                    match storage.purge_audit_before(cutoff).await {
                        Ok(0) => {}
                        Ok(removed) => info!(removed, %cutoff, "Purged expired audit entries"),
                        Err(e) => warn!(error = %e, "Audit purge failed"),
                    }
                }
            }
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use erx_persistence::backends::sqlite::SqliteBackend;
    use erx_persistence::types::{AuditAction, AuditQuery, AuditResourceType};

    #[tokio::test]
    async fn test_entries_reach_storage_after_flush() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        backend.init_schema().unwrap();
        let sink = AuditSink::spawn(Arc::clone(&backend), 90);

        sink.record(AuditEntry::new(
            AuditAction::MedicineSearched,
            AuditResourceType::Medicine,
        ));
        sink.record(AuditEntry::new(
            AuditAction::UserLoginFailed,
            AuditResourceType::User,
        ));
        sink.flush().await;

        let page = backend.list_audit_logs(&AuditQuery::default()).await.unwrap();
        assert_eq!(page.pagination.total, 2);
    }
}
