//! User-facing notifications.
//!
//! The lifecycle service only ever *enqueues* notifications through
//! [`NotificationEmitter`]; delivery is best-effort. Reading and acknowledging
//! them goes through [`NotificationInbox`].

use crate::types::{NotificationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// What a notification refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A complaint was filed or changed status
    Complaint,
    /// A review was posted
    Review,
    /// Platform message
    System,
}

impl NotificationKind {
    /// Wire and storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complaint => "Complaint",
            Self::Review => "Review",
            Self::System => "System",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored kind string is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown notification kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for NotificationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Complaint" => Ok(Self::Complaint),
            "Review" => Ok(Self::Review),
            "System" => Ok(Self::System),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

/// A message queued for one recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification id
    pub id: NotificationId,
    /// User who will see it
    pub recipient: UserId,
    /// Human-readable text
    pub message: String,
    /// Category
    pub kind: NotificationKind,
    /// Id of the related complaint or restaurant
    pub reference_id: Option<Uuid>,
    /// Whether the recipient has seen it
    pub is_read: bool,
    /// When it was queued
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build an unread notification with a fresh id.
    #[must_use]
    pub fn new(
        recipient: UserId,
        message: impl Into<String>,
        kind: NotificationKind,
        reference_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient,
            message: message.into(),
            kind,
            reference_id,
            is_read: false,
            created_at,
        }
    }
}

/// Errors raised by notification collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// No notification with this id is addressed to the caller.
    #[error("Notification not found: {0}")]
    NotFound(NotificationId),

    /// The backing store could not be reached or rejected the write.
    #[error("Notification store unavailable: {0}")]
    Unavailable(String),
}

/// Queues notifications for later delivery.
pub trait NotificationEmitter: Send + Sync {
    /// Queue one notification.
    ///
    /// # Errors
    ///
    /// [`NotificationError::Unavailable`] if the notification could not be stored.
    fn enqueue(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>>;
}

/// Read side of the notification store.
pub trait NotificationInbox: Send + Sync {
    /// Notifications addressed to `recipient`, newest first.
    ///
    /// # Errors
    ///
    /// [`NotificationError::Unavailable`] on storage failure.
    fn list_for(
        &self,
        recipient: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Notification>, NotificationError>> + Send + '_>>;

    /// Every notification, newest first.
    ///
    /// # Errors
    ///
    /// [`NotificationError::Unavailable`] on storage failure.
    fn list_all(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Notification>, NotificationError>> + Send + '_>>;

    /// Mark a notification as read. Only its recipient may do so.
    ///
    /// # Errors
    ///
    /// [`NotificationError::NotFound`] if the id is unknown or addressed to
    /// someone else.
    fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Notification, NotificationError>> + Send + '_>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new(
            UserId::new(),
            "New complaint submitted for Blue Door",
            NotificationKind::Complaint,
            None,
            Utc::now(),
        );
        assert!(!n.is_read);

        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "Complaint");
        assert_eq!(json["isRead"], false);
        assert!(json["referenceId"].is_null());
    }

    #[test]
    fn kind_parses_storage_names() {
        assert_eq!("Review".parse(), Ok(NotificationKind::Review));
        assert!("Email".parse::<NotificationKind>().is_err());
    }
}
