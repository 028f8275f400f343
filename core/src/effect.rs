//! Side effects as values.
//!
//! After a lifecycle operation has persisted its aggregate it describes the
//! follow-up work (notify the owner, broadcast the change) as [`SideEffect`]
//! values. The runtime executes them out of band; their outcome never flows
//! back into the operation's result.

use crate::complaint::ComplaintRecord;
use crate::notification::{Notification, NotificationKind};
use crate::realtime::{NEW_COMPLAINT_MESSAGE, RealtimeEvent};
use crate::restaurant::Restaurant;
use chrono::{DateTime, Utc};

/// Best-effort follow-up work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SideEffect {
    /// Queue a notification
    Notify(Notification),
    /// Publish a realtime event
    Broadcast(RealtimeEvent),
}

impl SideEffect {
    /// Label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Notify(_) => "notification",
            Self::Broadcast(_) => "broadcast",
        }
    }
}

/// Effects for a complaint that was just filed against `restaurant`.
///
/// The owner is told which restaurant received a complaint and subscribers
/// receive a `newComplaint` event.
#[must_use]
pub fn complaint_filed(
    restaurant: &Restaurant,
    complaint: &ComplaintRecord,
    at: DateTime<Utc>,
) -> Vec<SideEffect> {
    vec![
        SideEffect::Notify(Notification::new(
            restaurant.owner(),
            format!("New complaint submitted for {}", restaurant.name()),
            NotificationKind::Complaint,
            Some(*restaurant.id().as_uuid()),
            at,
        )),
        SideEffect::Broadcast(RealtimeEvent::ComplaintFiled {
            complaint_id: complaint.id(),
            restaurant_id: restaurant.id(),
            message: NEW_COMPLAINT_MESSAGE.to_string(),
        }),
    ]
}

/// Effects for a complaint whose status was just changed.
///
/// Exactly one notification, addressed to the restaurant owner, plus one
/// `complaintUpdated` event.
#[must_use]
pub fn status_changed(
    restaurant: &Restaurant,
    complaint: &ComplaintRecord,
    at: DateTime<Utc>,
) -> Vec<SideEffect> {
    vec![
        SideEffect::Notify(Notification::new(
            restaurant.owner(),
            format!(
                "Complaint {} at {} is now {}",
                complaint.id(),
                restaurant.name(),
                complaint.status()
            ),
            NotificationKind::Complaint,
            Some(*complaint.id().as_uuid()),
            at,
        )),
        SideEffect::Broadcast(RealtimeEvent::ComplaintUpdated {
            complaint_id: complaint.id(),
            new_status: complaint.status(),
        }),
    ]
}
