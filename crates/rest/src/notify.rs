//! Notification delivery.
//!
//! [`NotificationDispatcher::dispatch`] returns immediately. A worker task
//! persists each notification and then publishes it to live subscribers of
//! the owning user. Delivery failures are logged and never reach the caller.

use std::sync::Arc;

use erx_persistence::core::NotificationStorage;
use erx_persistence::types::{NewNotification, Notification, RecordId};
use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

/// Capacity of the delivery queue.
pub const DISPATCH_QUEUE_CAPACITY: usize = 1024;

/// Events buffered per live subscriber before it starts missing some.
pub const SUBSCRIBER_BUFFER: usize = 64;

enum DispatchMessage {
    Deliver(NewNotification),
    Flush(oneshot::Sender<()>),
}

/// Handle used by request handlers to send notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<DispatchMessage>,
    events: broadcast::Sender<Notification>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl NotificationDispatcher {
    /// Starts the delivery worker and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S>(storage: Arc<S>) -> Self
    where
        S: NotificationStorage + ?Sized + 'static,
    {
        let (sender, receiver) = mpsc::channel(DISPATCH_QUEUE_CAPACITY);
        let (events, _) = broadcast::channel(SUBSCRIBER_BUFFER);

        let publisher = events.clone();
        tokio::spawn(async move {
            Self::worker(receiver, storage, publisher).await;
        });

        Self { sender, events }
    }

    /// Queues a notification for delivery.
    pub fn dispatch(&self, notification: NewNotification) {
        let user = notification.user.clone();
        if let Err(e) = self.sender.try_send(DispatchMessage::Deliver(notification)) {
            warn!(%user, error = %e, "Dropping notification");
        }
    }

    /// Waits until every notification queued before this call has been handled.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(DispatchMessage::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Live notifications for `user`, starting now.
    pub fn subscribe(&self, user: RecordId) -> impl Stream<Item = Notification> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(move |event| {
            let user = user.clone();
            async move {
                match event {
                    Ok(notification) if notification.user == user => Some(notification),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(missed)) => {
                        warn!(%user, missed, "Notification subscriber lagged");
                        None
                    }
                }
            }
        })
    }

    async fn worker<S>(
        mut receiver: mpsc::Receiver<DispatchMessage>,
        storage: Arc<S>,
        events: broadcast::Sender<Notification>,
    ) where
        S: NotificationStorage + ?Sized,
    {
        while let Some(message) = receiver.recv().await {
            match message {
                DispatchMessage::Deliver(notification) => {
                    let user = notification.user.clone();
                    match storage.create_notification(notification).await {
                        Ok(stored) => {
                            let live = events.send(stored).unwrap_or(0);
                            debug!(%user, live, "Notification delivered");
                        }
                        Err(e) => warn!(%user, error = %e, "Failed to store notification"),
                    }
                }
                DispatchMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Notification queue closed, stopping worker");
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use erx_persistence::backends::sqlite::SqliteBackend;
    use erx_persistence::types::IdGenerator;
    use std::time::Duration;

    fn note(user: &RecordId, title: &str) -> NewNotification {
        NewNotification {
            user: user.clone(),
            kind: "prescription_created".to_string(),
            title: title.to_string(),
            message: "Prescription for Jane Doe".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_persists_and_publishes_to_owner_only() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        backend.init_schema().unwrap();
        let dispatcher = NotificationDispatcher::spawn(Arc::clone(&backend));

        let ids = IdGenerator::new();
        let (alice, bob) = (ids.next_id(), ids.next_id());
        let mut stream = Box::pin(dispatcher.subscribe(alice.clone()));

        dispatcher.dispatch(note(&bob, "for bob"));
        dispatcher.dispatch(note(&alice, "for alice"));
        dispatcher.flush().await;

        let received = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.title, "for alice");
        assert!(!received.read);

        assert_eq!(backend.unread_count(&alice).await.unwrap(), 1);
        assert_eq!(backend.unread_count(&bob).await.unwrap(), 1);
    }
}
