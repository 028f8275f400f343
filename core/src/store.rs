//! Aggregate store trait and related types.
//!
//! The store persists whole [`Restaurant`] aggregates. It is the transactional
//! boundary for everything a restaurant owns: a save either commits the whole
//! document (including every embedded complaint) or nothing.
//!
//! # Optimistic Concurrency
//!
//! Every aggregate carries the [`Version`] it was loaded at. [`AggregateStore::save`]
//! succeeds only if the persisted version still equals that value, and then
//! bumps it. A writer that lost the race receives
//! [`StoreError::ConcurrencyConflict`] and must reload before trying again.
//!
//! # Complaint Index
//!
//! Implementations keep an index from complaint id to owning restaurant id,
//! updated in the same atomic write as the aggregate, so that
//! [`AggregateStore::load_by_complaint`] never scans every restaurant.
//!
//! # Implementations
//!
//! - `PostgresAggregateStore` (in `complaint-desk-postgres`): production
//! - `InMemoryAggregateStore` (in `complaint-desk-testing`): fast, deterministic tests

use crate::restaurant::{Restaurant, Version};
use crate::types::{ComplaintId, RestaurantId, UserId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during aggregate store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The aggregate changed between load and save.
    #[error("Concurrency conflict on restaurant {restaurant_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate where the conflict occurred.
        restaurant_id: RestaurantId,
        /// The version the writer loaded.
        expected: Version,
        /// The version currently persisted.
        actual: Version,
    },

    /// Save was called for an aggregate that was never inserted.
    #[error("Restaurant not found: {0}")]
    AggregateNotFound(RestaurantId),

    /// Insert was called for an id that already exists.
    #[error("Restaurant already exists: {0}")]
    DuplicateAggregate(RestaurantId),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistence for Restaurant aggregates.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
/// store can be shared as `Arc<dyn AggregateStore>`.
pub trait AggregateStore: Send + Sync {
    /// Persist a new aggregate at [`Version::INITIAL`].
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateAggregate`] if the id is taken, or an
    /// infrastructure error.
    fn insert(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>>;

    /// Load an aggregate by id, stamped with its current version.
    ///
    /// # Errors
    ///
    /// Infrastructure errors only; a missing aggregate is `Ok(None)`.
    fn load(
        &self,
        restaurant_id: RestaurantId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>>;

    /// Load the aggregate that owns the given complaint through the complaint index.
    ///
    /// # Errors
    ///
    /// Infrastructure errors only; an unknown complaint is `Ok(None)`.
    fn load_by_complaint(
        &self,
        complaint_id: ComplaintId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>>;

    /// Atomically replace an aggregate, expecting it to still be at
    /// `restaurant.version()`. Returns the new version.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConcurrencyConflict`] if another writer saved first
    /// - [`StoreError::AggregateNotFound`] if the aggregate does not exist
    /// - infrastructure errors
    fn save(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>>;

    /// Every aggregate, oldest registration first.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    fn list(&self)
    -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>>;

    /// Aggregates holding at least one complaint filed by `submitter`.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    fn list_by_submitter(
        &self,
        submitter: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>>;

    /// Cheap reachability check used by readiness probes.
    ///
    /// # Errors
    ///
    /// The store cannot be reached.
    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;
}
