//! The Complaint Record and its activity log.
//!
//! A complaint lives inside its owning [`Restaurant`](crate::restaurant::Restaurant)
//! aggregate. Fields are private: the only way to change `status`, `remark` or
//! the activity log after creation is
//! [`apply_transition`](crate::transition::apply_transition), which keeps the
//! log and the current status consistent.

use crate::types::{ComplaintId, RestaurantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Remark recorded on the activity entry that seeds every new complaint.
pub const SUBMITTED_REMARK: &str = "Complaint submitted.";

/// Position of a complaint in the handling workflow.
///
/// The declaration order is the workflow order, so the derived `Ord` gives
/// `Submitted < Acknowledged < ActionTaken < Resolved`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComplaintStatus {
    /// Filed by a customer, not yet looked at
    Submitted,
    /// An official has seen the complaint
    Acknowledged,
    /// Corrective action is under way
    #[serde(rename = "Action Taken")]
    ActionTaken,
    /// Terminal state
    Resolved,
}

impl ComplaintStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 4] = [
        Self::Submitted,
        Self::Acknowledged,
        Self::ActionTaken,
        Self::Resolved,
    ];

    /// Whether entering this status needs a non-blank remark.
    #[must_use]
    pub const fn requires_remark(self) -> bool {
        matches!(self, Self::ActionTaken | Self::Resolved)
    }

    /// Whether no later status exists.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Human-readable name, identical to the wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Acknowledged => "Acknowledged",
            Self::ActionTaken => "Action Taken",
            Self::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not part of the workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown complaint status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for ComplaintStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Submitted" => Ok(Self::Submitted),
            "Acknowledged" => Ok(Self::Acknowledged),
            "Action Taken" | "ActionTaken" => Ok(Self::ActionTaken),
            "Resolved" => Ok(Self::Resolved),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// One entry of the append-only audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Who made the change
    pub actor: UserId,
    /// Status of the complaint right after the change
    pub status: ComplaintStatus,
    /// Remark supplied with the change (may be empty)
    pub remark: String,
    /// When the change was applied
    pub timestamp: DateTime<Utc>,
}

/// Errors raised while creating a complaint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComplaintError {
    /// The complaint body is empty or whitespace only
    #[error("Complaint message is required")]
    EmptyMessage,
}

/// A complaint filed against a restaurant.
///
/// Identity is the [`ComplaintId`]: two records with the same id compare equal
/// even if one of them is a later revision.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRecord {
    id: ComplaintId,
    submitter: UserId,
    restaurant_id: RestaurantId,
    message: String,
    status: ComplaintStatus,
    remark: String,
    activity_log: Vec<ActivityEntry>,
    created_at: DateTime<Utc>,
}

impl ComplaintRecord {
    /// Create a freshly filed complaint.
    ///
    /// The record starts at [`ComplaintStatus::Submitted`] with a single
    /// activity entry attributed to the submitter.
    ///
    /// # Errors
    ///
    /// Returns [`ComplaintError::EmptyMessage`] if `message` is blank.
    pub fn file(
        id: ComplaintId,
        submitter: UserId,
        restaurant_id: RestaurantId,
        message: impl Into<String>,
        filed_at: DateTime<Utc>,
    ) -> Result<Self, ComplaintError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ComplaintError::EmptyMessage);
        }

        Ok(Self {
            id,
            submitter,
            restaurant_id,
            message,
            status: ComplaintStatus::Submitted,
            remark: String::new(),
            activity_log: vec![ActivityEntry {
                actor: submitter,
                status: ComplaintStatus::Submitted,
                remark: SUBMITTED_REMARK.to_string(),
                timestamp: filed_at,
            }],
            created_at: filed_at,
        })
    }

    /// Complaint id
    #[must_use]
    pub const fn id(&self) -> ComplaintId {
        self.id
    }

    /// User who filed the complaint
    #[must_use]
    pub const fn submitter(&self) -> UserId {
        self.submitter
    }

    /// Owning restaurant
    #[must_use]
    pub const fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    /// Complaint body
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Current workflow status
    #[must_use]
    pub const fn status(&self) -> ComplaintStatus {
        self.status
    }

    /// Remark attached to the most recent status change
    #[must_use]
    pub fn remark(&self) -> &str {
        &self.remark
    }

    /// Audit trail, oldest first
    #[must_use]
    pub fn activity_log(&self) -> &[ActivityEntry] {
        &self.activity_log
    }

    /// When the complaint was filed
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Set the status and remark and append the matching log entry in one step.
    pub(crate) fn record_change(&mut self, entry: ActivityEntry) {
        self.status = entry.status;
        self.remark.clone_from(&entry.remark);
        self.activity_log.push(entry);
    }
}

impl PartialEq for ComplaintRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComplaintRecord {}
