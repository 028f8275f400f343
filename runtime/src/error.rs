//! Errors surfaced by the lifecycle service.

use complaint_desk_core::complaint::ComplaintError;
use complaint_desk_core::notification::NotificationError;
use complaint_desk_core::store::StoreError;
use complaint_desk_core::transition::TransitionError;
use complaint_desk_core::types::RestaurantId;
use std::fmt::Display;
use thiserror::Error;

/// Errors returned by [`ComplaintLifecycleService`](crate::lifecycle::ComplaintLifecycleService).
///
/// `NotFound`, `InvalidInput` and `Transition` are caller mistakes and carry
/// messages safe to show. `ConcurrencyConflict` means the bounded retry gave
/// up. `Persistence` wraps infrastructure failures whose detail must not leak
/// past the logs.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The referenced restaurant, complaint or notification does not exist.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of resource, e.g. `"Complaint"`
        resource: &'static str,
        /// Id as given by the caller
        id: String,
    },

    /// Request failed validation before reaching the workflow.
    #[error("{0}")]
    InvalidInput(String),

    /// The transition engine refused the change.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Another writer kept winning the race for this aggregate.
    #[error("Restaurant {restaurant_id} was modified concurrently")]
    ConcurrencyConflict {
        /// Contended aggregate
        restaurant_id: RestaurantId,
    },

    /// The store is unavailable or the write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ServiceError {
    /// Shorthand for [`ServiceError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether reloading and retrying may succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ConcurrencyConflict { restaurant_id, .. } => {
                Self::ConcurrencyConflict { restaurant_id }
            },
            StoreError::AggregateNotFound(id) => Self::not_found("Restaurant", id),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<NotificationError> for ServiceError {
    fn from(error: NotificationError) -> Self {
        match error {
            NotificationError::NotFound(id) => Self::not_found("Notification", id),
            NotificationError::Unavailable(detail) => Self::Persistence(detail),
        }
    }
}

impl From<ComplaintError> for ServiceError {
    fn from(error: ComplaintError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}
