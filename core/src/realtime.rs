//! Realtime events pushed to connected clients.
//!
//! Events serialize as `{"event": "<name>", "data": {...}}`, the frame format
//! WebSocket subscribers receive.

use crate::complaint::ComplaintStatus;
use crate::types::{ComplaintId, RestaurantId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Message carried by every `newComplaint` event.
pub const NEW_COMPLAINT_MESSAGE: &str = "New complaint submitted!";

/// An event fanned out to realtime subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    /// A customer filed a complaint
    #[serde(rename = "newComplaint", rename_all = "camelCase")]
    ComplaintFiled {
        /// New complaint
        complaint_id: ComplaintId,
        /// Restaurant it was filed against
        restaurant_id: RestaurantId,
        /// Display text
        message: String,
    },

    /// A complaint moved through the status workflow
    #[serde(rename = "complaintUpdated", rename_all = "camelCase")]
    ComplaintUpdated {
        /// Updated complaint
        complaint_id: ComplaintId,
        /// Status after the change
        new_status: ComplaintStatus,
    },
}

impl RealtimeEvent {
    /// Event name as seen on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ComplaintFiled { .. } => "newComplaint",
            Self::ComplaintUpdated { .. } => "complaintUpdated",
        }
    }
}

/// Errors raised while publishing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// The event could not be encoded.
    #[error("Failed to encode realtime event: {0}")]
    Encoding(String),

    /// The transport is gone.
    #[error("Realtime transport closed: {0}")]
    Closed(String),
}

/// Fans events out to zero or more subscribers with no delivery guarantee.
pub trait RealtimeBroadcaster: Send + Sync {
    /// Publish one event. Having no subscribers is not an error.
    ///
    /// # Errors
    ///
    /// [`BroadcastError`] if the transport failed.
    fn publish(
        &self,
        event: RealtimeEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), BroadcastError>> + Send + '_>>;
}
