//! Environment traits for dependency injection.
//!
//! Services never read the wall clock directly; they take a [`Clock`] so tests
//! can pin time.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use chrono::{DateTime, Utc};
/// use complaint_desk_core::environment::{Clock, SystemClock};
///
/// struct FixedClock { time: DateTime<Utc> }
/// impl Clock for FixedClock {
///     fn now(&self) -> DateTime<Utc> {
///         self.time
///     }
/// }
///
/// let _ = SystemClock.now();
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by [`Utc::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
