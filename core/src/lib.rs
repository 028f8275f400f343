//! # Complaint Desk Core
//!
//! Domain types and pure logic for the restaurant complaint lifecycle.
//!
//! This crate has no I/O. It defines the data model, the status transition
//! engine and the traits through which the runtime reaches its collaborators.
//!
//! ## Core Concepts
//!
//! - **Restaurant**: the aggregate; owns its complaints and is persisted whole
//! - **Complaint Record**: one complaint with its append-only activity log
//! - **Transition**: a validated status change, see [`transition::apply_transition`]
//! - **Side effect**: best-effort follow-up work described as a value
//! - **Environment**: injected collaborators ([`store::AggregateStore`],
//!   [`notification::NotificationEmitter`], [`realtime::RealtimeBroadcaster`],
//!   [`environment::Clock`])
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use complaint_desk_core::prelude::*;
//!
//! let mut restaurant = Restaurant::new(RestaurantId::new(), "Blue Door", UserId::new(), Utc::now());
//! let complaint = ComplaintRecord::file(
//!     ComplaintId::new(), UserId::new(), restaurant.id(), "Cold soup", Utc::now(),
//! ).unwrap();
//! restaurant.add_complaint(complaint.clone());
//!
//! let updated = apply_transition(
//!     &complaint, ComplaintStatus::ActionTaken, Some("Kitchen inspected"), UserId::new(), Utc::now(),
//! ).unwrap();
//! assert!(restaurant.replace_complaint(updated));
//! ```

pub mod complaint;
pub mod effect;
pub mod environment;
pub mod notification;
pub mod realtime;
pub mod restaurant;
pub mod store;
pub mod transition;
pub mod types;
pub mod views;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::complaint::{ActivityEntry, ComplaintError, ComplaintRecord, ComplaintStatus};
    pub use crate::effect::SideEffect;
    pub use crate::environment::{Clock, SystemClock};
    pub use crate::notification::{
        Notification, NotificationEmitter, NotificationError, NotificationInbox, NotificationKind,
    };
    pub use crate::realtime::{BroadcastError, RealtimeBroadcaster, RealtimeEvent};
    pub use crate::restaurant::{Restaurant, RestaurantSummary, Version};
    pub use crate::store::{AggregateStore, StoreError};
    pub use crate::transition::{TransitionError, apply_transition};
    pub use crate::types::{ComplaintId, NotificationId, RestaurantId, Role, UserId};
    pub use crate::views::{ComplaintSummary, ComplaintView};
}
