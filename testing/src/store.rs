//! In-memory aggregate store with optimistic concurrency.
//!
//! Behaves like the PostgreSQL store (version check, complaint index,
//! registration order) and adds knobs for simulating concurrent writers and
//! outages.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on lock poisoning

use complaint_desk_core::restaurant::{Restaurant, Version};
use complaint_desk_core::store::{AggregateStore, StoreError};
use complaint_desk_core::types::{ComplaintId, RestaurantId, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct State {
    documents: HashMap<RestaurantId, (Version, Restaurant)>,
    registration_order: Vec<RestaurantId>,
    complaint_index: HashMap<ComplaintId, RestaurantId>,
    injected_conflicts: usize,
    unavailable: bool,
    yield_after_load: bool,
    saves: usize,
    conflicts: usize,
}

impl State {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Database("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn stamped(&self, id: RestaurantId) -> Option<Restaurant> {
        self.documents
            .get(&id)
            .map(|(version, restaurant)| restaurant.clone().with_version(*version))
    }

    fn index(&mut self, restaurant: &Restaurant) {
        for complaint in restaurant.complaints() {
            self.complaint_index.insert(complaint.id(), restaurant.id());
        }
    }
}

/// `HashMap`-backed [`AggregateStore`].
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use complaint_desk_core::prelude::*;
/// use complaint_desk_testing::InMemoryAggregateStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryAggregateStore::new();
/// let restaurant = Restaurant::new(RestaurantId::new(), "Blue Door", UserId::new(), Utc::now());
/// let version = store.insert(restaurant.clone()).await.unwrap();
///
/// let loaded = store.load(restaurant.id()).await.unwrap().unwrap();
/// assert_eq!(loaded.version(), version);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryAggregateStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryAggregateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves lose a race: before each of them the
    /// persisted version is bumped as if another writer had saved first.
    pub fn inject_conflicts(&self, count: usize) {
        self.state.write().unwrap().injected_conflicts = count;
    }

    /// Make every operation fail with [`StoreError::Database`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Yield to the scheduler after every load, so concurrent callers on one
    /// task interleave their read-modify-write cycles.
    pub fn yield_after_load(&self, enabled: bool) {
        self.state.write().unwrap().yield_after_load = enabled;
    }

    /// Number of saves rejected with [`StoreError::ConcurrencyConflict`].
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.state.read().unwrap().conflicts
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state.read().unwrap().saves
    }

    /// Persisted version of an aggregate.
    #[must_use]
    pub fn version_of(&self, id: RestaurantId) -> Option<Version> {
        self.state.read().unwrap().documents.get(&id).map(|(v, _)| *v)
    }

    /// Persisted copy of an aggregate, without going through the trait.
    #[must_use]
    pub fn snapshot(&self, id: RestaurantId) -> Option<Restaurant> {
        self.state.read().unwrap().stamped(id)
    }

    async fn after_load(&self) {
        let pause = self.state.read().unwrap().yield_after_load;
        if pause {
            tokio::task::yield_now().await;
        }
    }
}

impl AggregateStore for InMemoryAggregateStore {
    fn insert(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            state.check_available()?;

            let id = restaurant.id();
            if state.documents.contains_key(&id) {
                return Err(StoreError::DuplicateAggregate(id));
            }

            state.index(&restaurant);
            state.registration_order.push(id);
            state.documents.insert(id, (Version::INITIAL, restaurant));
            Ok(Version::INITIAL)
        })
    }

    fn load(
        &self,
        restaurant_id: RestaurantId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let loaded = {
                let state = self.state.read().unwrap();
                state.check_available()?;
                state.stamped(restaurant_id)
            };
            self.after_load().await;
            Ok(loaded)
        })
    }

    fn load_by_complaint(
        &self,
        complaint_id: ComplaintId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let loaded = {
                let state = self.state.read().unwrap();
                state.check_available()?;
                state
                    .complaint_index
                    .get(&complaint_id)
                    .and_then(|id| state.stamped(*id))
            };
            self.after_load().await;
            Ok(loaded)
        })
    }

    fn save(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            state.check_available()?;

            let id = restaurant.id();
            let expected = restaurant.version();

            if state.injected_conflicts > 0 {
                state.injected_conflicts -= 1;
                if let Some((version, _)) = state.documents.get_mut(&id) {
                    *version = version.next();
                }
            }

            let actual = state
                .documents
                .get(&id)
                .map(|(v, _)| *v)
                .ok_or(StoreError::AggregateNotFound(id))?;

            if actual != expected {
                state.conflicts += 1;
                return Err(StoreError::ConcurrencyConflict {
                    restaurant_id: id,
                    expected,
                    actual,
                });
            }

            let next = actual.next();
            state.index(&restaurant);
            state.documents.insert(id, (next, restaurant));
            state.saves += 1;
            Ok(next)
        })
    }

    fn list(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.read().unwrap();
            state.check_available()?;
            Ok(state
                .registration_order
                .iter()
                .filter_map(|id| state.stamped(*id))
                .collect())
        })
    }

    fn list_by_submitter(
        &self,
        submitter: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.read().unwrap();
            state.check_available()?;
            Ok(state
                .registration_order
                .iter()
                .filter_map(|id| state.stamped(*id))
                .filter(|r| r.complaints().iter().any(|c| c.submitter() == submitter))
                .collect())
        })
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move { self.state.read().unwrap().check_available() })
    }
}
