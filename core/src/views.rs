//! Read models returned by complaint queries.

use crate::complaint::{ComplaintRecord, ComplaintStatus};
use crate::restaurant::{Restaurant, RestaurantSummary};
use crate::types::{ComplaintId, RestaurantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complaint together with the restaurant it was filed against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintView {
    /// Full record including the activity log
    #[serde(flatten)]
    pub complaint: ComplaintRecord,
    /// Owning restaurant
    pub restaurant: RestaurantSummary,
}

/// Flattened listing row for complaints across restaurants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintSummary {
    /// Complaint id
    pub complaint_id: ComplaintId,
    /// Owning restaurant
    pub restaurant_id: RestaurantId,
    /// Owning restaurant name
    pub restaurant_name: String,
    /// User who filed it
    pub submitter: UserId,
    /// Complaint body
    pub message: String,
    /// Current status
    pub status: ComplaintStatus,
    /// Latest remark
    pub remark: String,
    /// When it was filed
    pub created_at: DateTime<Utc>,
}

impl ComplaintSummary {
    /// Summarize one complaint of `restaurant`.
    #[must_use]
    pub fn of(restaurant: &Restaurant, complaint: &ComplaintRecord) -> Self {
        Self {
            complaint_id: complaint.id(),
            restaurant_id: restaurant.id(),
            restaurant_name: restaurant.name().to_string(),
            submitter: complaint.submitter(),
            message: complaint.message().to_string(),
            status: complaint.status(),
            remark: complaint.remark().to_string(),
            created_at: complaint.created_at(),
        }
    }
}
