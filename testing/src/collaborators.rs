//! Recording notification and realtime collaborators.
//!
//! Both can be told to fail or to stall, so tests can check that
//! best-effort side effects never change an operation's outcome.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on lock poisoning

use complaint_desk_core::notification::{
    Notification, NotificationEmitter, NotificationError, NotificationInbox,
};
use complaint_desk_core::realtime::{BroadcastError, RealtimeBroadcaster, RealtimeEvent};
use complaint_desk_core::types::{NotificationId, UserId};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Default)]
struct Behaviour {
    failure: Option<String>,
    delay: Option<Duration>,
}

impl Behaviour {
    fn delay(&self) -> Option<Duration> {
        self.delay
    }
}

/// In-memory notification queue implementing both emitter and inbox.
#[derive(Clone, Debug, Default)]
pub struct InMemoryNotifications {
    notifications: Arc<RwLock<Vec<Notification>>>,
    behaviour: Arc<RwLock<Behaviour>>,
}

impl InMemoryNotifications {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `enqueue` fail with the given reason.
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.behaviour.write().unwrap().failure = Some(reason.into());
    }

    /// Make every `enqueue` sleep before completing.
    pub fn stall_for(&self, delay: Duration) {
        self.behaviour.write().unwrap().delay = Some(delay);
    }

    /// Everything successfully enqueued, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.notifications.read().unwrap().clone()
    }

    /// Notifications addressed to `recipient`, in enqueue order.
    #[must_use]
    pub fn sent_to(&self, recipient: UserId) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.recipient == recipient)
            .collect()
    }

    fn newest_first(&self, filter: impl Fn(&Notification) -> bool) -> Vec<Notification> {
        let mut list: Vec<_> = self
            .notifications
            .read()
            .unwrap()
            .iter()
            .filter(|n| filter(n))
            .cloned()
            .collect();
        list.reverse();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }
}

impl NotificationEmitter for InMemoryNotifications {
    fn enqueue(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        Box::pin(async move {
            let delay = self.behaviour.read().unwrap().delay();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let failure = self.behaviour.read().unwrap().failure.clone();
            if let Some(reason) = failure {
                return Err(NotificationError::Unavailable(reason));
            }

            self.notifications.write().unwrap().push(notification);
            Ok(())
        })
    }
}

impl NotificationInbox for InMemoryNotifications {
    fn list_for(
        &self,
        recipient: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Notification>, NotificationError>> + Send + '_>>
    {
        Box::pin(async move { Ok(self.newest_first(|n| n.recipient == recipient)) })
    }

    fn list_all(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Notification>, NotificationError>> + Send + '_>>
    {
        Box::pin(async move { Ok(self.newest_first(|_| true)) })
    }

    fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Notification, NotificationError>> + Send + '_>> {
        Box::pin(async move {
            let mut notifications = self.notifications.write().unwrap();
            let notification = notifications
                .iter_mut()
                .find(|n| n.id == id && n.recipient == recipient)
                .ok_or(NotificationError::NotFound(id))?;
            notification.is_read = true;
            Ok(notification.clone())
        })
    }
}

/// Broadcaster that records every published event.
#[derive(Clone, Debug, Default)]
pub struct RecordingBroadcaster {
    events: Arc<RwLock<Vec<RealtimeEvent>>>,
    behaviour: Arc<RwLock<Behaviour>>,
}

impl RecordingBroadcaster {
    /// Create a broadcaster with no recorded events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `publish` fail with the given reason.
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.behaviour.write().unwrap().failure = Some(reason.into());
    }

    /// Make every `publish` sleep before completing.
    pub fn stall_for(&self, delay: Duration) {
        self.behaviour.write().unwrap().delay = Some(delay);
    }

    /// Events published successfully, in order.
    #[must_use]
    pub fn events(&self) -> Vec<RealtimeEvent> {
        self.events.read().unwrap().clone()
    }
}

impl RealtimeBroadcaster for RecordingBroadcaster {
    fn publish(
        &self,
        event: RealtimeEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), BroadcastError>> + Send + '_>> {
        Box::pin(async move {
            let delay = self.behaviour.read().unwrap().delay();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let failure = self.behaviour.read().unwrap().failure.clone();
            if let Some(reason) = failure {
                return Err(BroadcastError::Closed(reason));
            }

            self.events.write().unwrap().push(event);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use complaint_desk_core::notification::NotificationKind;

    #[tokio::test]
    async fn inbox_lists_newest_first_and_scopes_mark_read() {
        let notifications = InMemoryNotifications::new();
        let owner = UserId::new();
        let now = Utc::now();

        let older = Notification::new(owner, "first", NotificationKind::Complaint, None, now);
        let newer = Notification::new(
            owner,
            "second",
            NotificationKind::Complaint,
            None,
            now + ChronoDuration::seconds(5),
        );
        notifications.enqueue(older.clone()).await.unwrap();
        notifications.enqueue(newer.clone()).await.unwrap();

        let listed = notifications.list_for(owner).await.unwrap();
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);

        assert_eq!(
            notifications.mark_read(older.id, UserId::new()).await,
            Err(NotificationError::NotFound(older.id))
        );
        assert!(notifications.mark_read(older.id, owner).await.unwrap().is_read);
    }

    #[tokio::test]
    async fn failing_broadcaster_records_nothing() {
        let broadcaster = RecordingBroadcaster::new();
        broadcaster.fail_with("socket closed");

        let result = broadcaster
            .publish(RealtimeEvent::ComplaintUpdated {
                complaint_id: complaint_desk_core::types::ComplaintId::new(),
                new_status: complaint_desk_core::complaint::ComplaintStatus::Resolved,
            })
            .await;

        assert!(result.is_err());
        assert!(broadcaster.events().is_empty());
    }
}
