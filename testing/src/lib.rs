//! # Complaint Desk Testing
//!
//! Testing utilities for Complaint Desk.
//!
//! This crate provides:
//! - In-memory implementations of the collaborator traits
//! - A fixed clock for deterministic timestamps
//! - Fixtures for restaurants and complaints
//!
//! ## Example
//!
//! ```ignore
//! use complaint_desk_testing::{InMemoryAggregateStore, InMemoryNotifications, RecordingBroadcaster, test_clock};
//!
//! #[tokio::test]
//! async fn resolves_complaint() {
//!     let store = InMemoryAggregateStore::new();
//!     let notifications = InMemoryNotifications::new();
//!     let broadcaster = RecordingBroadcaster::new();
//!     // wire into a LifecycleEnvironment ...
//! }
//! ```

use chrono::{DateTime, Utc};
use complaint_desk_core::environment::Clock;

mod collaborators;
mod store;

pub use collaborators::{InMemoryNotifications, RecordingBroadcaster};
pub use store::InMemoryAggregateStore;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use complaint_desk_testing::mocks::FixedClock;
    /// use complaint_desk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ready-made domain values.
pub mod fixtures {
    use super::{Clock, mocks::test_clock};
    use complaint_desk_core::complaint::{ComplaintRecord, ComplaintStatus};
    use complaint_desk_core::restaurant::Restaurant;
    use complaint_desk_core::transition::apply_transition;
    use complaint_desk_core::types::{ComplaintId, RestaurantId, UserId};

    /// A restaurant with no complaints, registered at the test clock's time.
    #[must_use]
    pub fn restaurant(name: &str) -> Restaurant {
        Restaurant::new(RestaurantId::new(), name, UserId::new(), test_clock().now())
    }

    /// A freshly filed complaint against `restaurant`.
    ///
    /// # Panics
    ///
    /// Panics if `message` is blank.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn complaint(restaurant: &Restaurant, message: &str) -> ComplaintRecord {
        ComplaintRecord::file(
            ComplaintId::new(),
            UserId::new(),
            restaurant.id(),
            message,
            test_clock().now(),
        )
        .expect("fixture complaint message must not be blank")
    }

    /// A restaurant holding one complaint that has been moved to `status`.
    ///
    /// # Panics
    ///
    /// Never for valid statuses; every status is reachable from `Submitted`.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn restaurant_with_complaint_at(
        status: ComplaintStatus,
    ) -> (Restaurant, ComplaintRecord) {
        let mut restaurant = restaurant("Blue Door");
        let filed = complaint(&restaurant, "Found a hair in the soup");
        let complaint = if status == ComplaintStatus::Submitted {
            filed
        } else {
            apply_transition(
                &filed,
                status,
                Some("fixture"),
                UserId::new(),
                test_clock().now(),
            )
            .expect("forward transition with remark is always accepted")
        };
        restaurant.add_complaint(complaint.clone());
        (restaurant, complaint)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
