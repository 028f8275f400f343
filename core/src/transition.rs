//! Status Transition Engine.
//!
//! Pure validation and application of a requested status change. The engine
//! never persists or notifies; it returns the next revision of the record or
//! the reason the change was refused.
//!
//! # State Machine
//!
//! ```text
//! Submitted ──► Acknowledged ──► Action Taken ──► Resolved
//!     │  ▲           │  ▲             │  ▲            │  ▲
//!     └──┘           └──┘             └──┘            └──┘
//!   (same-status changes are accepted and logged)
//! ```
//!
//! Any status may move to itself or to any later status. Entering
//! `Action Taken` or `Resolved` needs a non-blank remark.
//!
//! # Validation Order
//!
//! 1. Backward moves fail with [`TransitionError::BackwardTransition`]
//! 2. Missing remarks fail with [`TransitionError::RemarkRequired`]

use crate::complaint::{ActivityEntry, ComplaintRecord, ComplaintStatus};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Reasons a transition request is refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The requested status precedes the current one.
    #[error("Cannot move status backward from {from} to {to}")]
    BackwardTransition {
        /// Current status of the record
        from: ComplaintStatus,
        /// Requested status
        to: ComplaintStatus,
    },

    /// The requested status needs a remark and none was given.
    #[error("Remark is required when moving a complaint to {status}")]
    RemarkRequired {
        /// Requested status
        status: ComplaintStatus,
    },
}

impl TransitionError {
    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::BackwardTransition { .. } => "backward_transition",
            Self::RemarkRequired { .. } => "remark_required",
        }
    }
}

/// Validate and apply a status change.
///
/// On success the returned record has `status = requested`, `remark` set to
/// the trimmed remark (empty when none was given) and exactly one new
/// activity entry `{actor, requested, remark, at}` at the end of its log.
/// The input record is never modified.
///
/// # Errors
///
/// - [`TransitionError::BackwardTransition`] if `requested` precedes the
///   record's current status
/// - [`TransitionError::RemarkRequired`] if `requested` needs a remark and
///   `remark` is missing or whitespace only
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use complaint_desk_core::complaint::{ComplaintRecord, ComplaintStatus};
/// use complaint_desk_core::transition::{apply_transition, TransitionError};
/// use complaint_desk_core::types::{ComplaintId, RestaurantId, UserId};
///
/// let record = ComplaintRecord::file(
///     ComplaintId::new(), UserId::new(), RestaurantId::new(), "Cold soup", Utc::now(),
/// ).unwrap();
/// let official = UserId::new();
///
/// let refused = apply_transition(&record, ComplaintStatus::Resolved, Some(" "), official, Utc::now());
/// assert!(matches!(refused, Err(TransitionError::RemarkRequired { .. })));
///
/// let next = apply_transition(&record, ComplaintStatus::Acknowledged, None, official, Utc::now()).unwrap();
/// assert_eq!(next.status(), ComplaintStatus::Acknowledged);
/// assert_eq!(next.activity_log().len(), 2);
/// ```
pub fn apply_transition(
    record: &ComplaintRecord,
    requested: ComplaintStatus,
    remark: Option<&str>,
    actor: UserId,
    at: DateTime<Utc>,
) -> Result<ComplaintRecord, TransitionError> {
    let current = record.status();
    if requested < current {
        return Err(TransitionError::BackwardTransition {
            from: current,
            to: requested,
        });
    }

    let remark = remark.map(str::trim).unwrap_or_default();
    if requested.requires_remark() && remark.is_empty() {
        return Err(TransitionError::RemarkRequired { status: requested });
    }

    let mut next = record.clone();
    next.record_change(ActivityEntry {
        actor,
        status: requested,
        remark: remark.to_string(),
        timestamp: at,
    });
    Ok(next)
}
