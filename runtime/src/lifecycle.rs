//! Complaint Lifecycle Service.
//!
//! Orchestrates every operation that touches a Restaurant aggregate:
//!
//! 1. Load the aggregate (by restaurant id, or through the complaint index)
//! 2. Run the pure domain logic ([`apply_transition`], [`ComplaintRecord::file`])
//! 3. Save the whole aggregate with an optimistic version check, reloading
//!    and re-applying on conflict up to the configured number of retries
//! 4. Hand the resulting [`SideEffect`]s to the [`EffectDispatcher`]
//!
//! Side effects are only produced after a successful save and never influence
//! the returned result.

use crate::effects::EffectDispatcher;
use crate::error::ServiceError;
use crate::metrics::LifecycleMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use complaint_desk_core::complaint::{ComplaintRecord, ComplaintStatus};
use complaint_desk_core::effect;
use complaint_desk_core::environment::Clock;
use complaint_desk_core::notification::{
    Notification, NotificationEmitter, NotificationInbox,
};
use complaint_desk_core::realtime::RealtimeBroadcaster;
use complaint_desk_core::restaurant::Restaurant;
use complaint_desk_core::store::{AggregateStore, StoreError};
use complaint_desk_core::transition::{TransitionError, apply_transition};
use complaint_desk_core::types::{ComplaintId, NotificationId, RestaurantId, Role, UserId};
use complaint_desk_core::views::{ComplaintSummary, ComplaintView};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Collaborators injected into the service.
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Aggregate persistence
    pub store: Arc<dyn AggregateStore>,
    /// Notification queue (write side)
    pub notifier: Arc<dyn NotificationEmitter>,
    /// Notification queue (read side)
    pub inbox: Arc<dyn NotificationInbox>,
    /// Realtime fan-out
    pub broadcaster: Arc<dyn RealtimeBroadcaster>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

/// Tuning knobs for the service.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Retry policy for optimistic concurrency conflicts
    pub conflict_retry: RetryPolicy,
    /// Upper bound for each notification or broadcast call
    pub side_effect_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            conflict_retry: RetryPolicy::default(),
            side_effect_timeout: Duration::from_secs(2),
        }
    }
}

/// A request to move a complaint through the workflow.
#[derive(Debug, Clone)]
pub struct UpdateComplaintStatus {
    /// Restrict the lookup to this restaurant; `None` uses the complaint index
    pub restaurant_id: Option<RestaurantId>,
    /// Target complaint
    pub complaint_id: ComplaintId,
    /// Requested status
    pub status: ComplaintStatus,
    /// Remark for the activity log
    pub remark: Option<String>,
    /// Official performing the change
    pub actor: UserId,
}

/// Entry point for every complaint lifecycle operation.
#[derive(Clone)]
pub struct ComplaintLifecycleService {
    store: Arc<dyn AggregateStore>,
    inbox: Arc<dyn NotificationInbox>,
    clock: Arc<dyn Clock>,
    dispatcher: EffectDispatcher,
    conflict_retry: RetryPolicy,
}

impl ComplaintLifecycleService {
    /// Wire the service to its collaborators.
    #[must_use]
    pub fn new(env: LifecycleEnvironment, config: LifecycleConfig) -> Self {
        let dispatcher =
            EffectDispatcher::new(env.notifier, env.broadcaster, config.side_effect_timeout);
        Self {
            store: env.store,
            inbox: env.inbox,
            clock: env.clock,
            dispatcher,
            conflict_retry: config.conflict_retry,
        }
    }

    /// Side-effect dispatcher, exposed so the server can drain it on shutdown.
    #[must_use]
    pub const fn dispatcher(&self) -> &EffectDispatcher {
        &self.dispatcher
    }

    /// Register a restaurant with no complaints.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] for a blank name, or a persistence error.
    pub async fn register_restaurant(
        &self,
        name: &str,
        owner: UserId,
    ) -> Result<Restaurant, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Restaurant name is required".to_string(),
            ));
        }

        let restaurant = Restaurant::new(RestaurantId::new(), name, owner, self.clock.now());
        let version = self.store.insert(restaurant.clone()).await?;
        tracing::info!(restaurant_id = %restaurant.id(), owner = %owner, "Restaurant registered");
        Ok(restaurant.with_version(version))
    }

    /// File a complaint against a restaurant.
    ///
    /// The new record is seeded with a `Submitted` activity entry. After the
    /// save the owner is notified and a `newComplaint` event is published.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidInput`] for a blank message
    /// - [`ServiceError::NotFound`] if the restaurant does not exist
    /// - [`ServiceError::ConcurrencyConflict`] if retries are exhausted
    /// - [`ServiceError::Persistence`] on store failure
    pub async fn file_complaint(
        &self,
        restaurant_id: RestaurantId,
        submitter: UserId,
        message: &str,
    ) -> Result<ComplaintRecord, ServiceError> {
        let complaint = ComplaintRecord::file(
            ComplaintId::new(),
            submitter,
            restaurant_id,
            message,
            self.clock.now(),
        )?;

        let restaurant = retry_with_predicate(
            &self.conflict_retry,
            || self.try_file(&complaint),
            ServiceError::is_conflict,
        )
        .await?;

        LifecycleMetrics::record_filed();
        tracing::info!(
            complaint_id = %complaint.id(),
            restaurant_id = %restaurant_id,
            submitter = %submitter,
            "Complaint filed"
        );

        let effects = effect::complaint_filed(&restaurant, &complaint, self.clock.now());
        self.dispatcher.dispatch(complaint.id(), effects);
        Ok(complaint)
    }

    async fn try_file(&self, complaint: &ComplaintRecord) -> Result<Restaurant, ServiceError> {
        let restaurant_id = complaint.restaurant_id();
        let mut restaurant = self
            .store
            .load(restaurant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Restaurant", restaurant_id))?;

        if !restaurant.add_complaint(complaint.clone()) {
            return Err(ServiceError::Persistence(format!(
                "restaurant {} refused complaint {}",
                restaurant.id(),
                complaint.id()
            )));
        }
        self.save(restaurant).await
    }

    /// Apply a status change to a complaint and persist it.
    ///
    /// On success the owner receives exactly one notification and a
    /// `complaintUpdated` event is published; both are best-effort.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the complaint (or the scoping
    ///   restaurant) does not exist
    /// - [`ServiceError::Transition`] with the engine's error, unchanged
    /// - [`ServiceError::ConcurrencyConflict`] if retries are exhausted
    /// - [`ServiceError::Persistence`] on store failure
    pub async fn update_complaint_status(
        &self,
        request: UpdateComplaintStatus,
    ) -> Result<ComplaintRecord, ServiceError> {
        let start = Instant::now();

        let result = retry_with_predicate(
            &self.conflict_retry,
            || self.try_update(&request),
            ServiceError::is_conflict,
        )
        .await;

        match result {
            Ok((restaurant, updated)) => {
                LifecycleMetrics::record_applied(updated.status().as_str(), start.elapsed());
                tracing::info!(
                    complaint_id = %updated.id(),
                    restaurant_id = %restaurant.id(),
                    actor = %request.actor,
                    status = %updated.status(),
                    "Complaint status updated"
                );

                let effects = effect::status_changed(&restaurant, &updated, self.clock.now());
                self.dispatcher.dispatch(updated.id(), effects);
                Ok(updated)
            },
            Err(ServiceError::Transition(error)) => {
                LifecycleMetrics::record_rejected(error.reason());
                if let TransitionError::BackwardTransition { from, to } = error {
                    tracing::info!(
                        complaint_id = %request.complaint_id,
                        actor = %request.actor,
                        from = %from,
                        to = %to,
                        "Rejected backward status transition"
                    );
                }
                Err(ServiceError::Transition(error))
            },
            Err(error) => Err(error),
        }
    }

    async fn try_update(
        &self,
        request: &UpdateComplaintStatus,
    ) -> Result<(Restaurant, ComplaintRecord), ServiceError> {
        let mut restaurant = self
            .locate(request.restaurant_id, request.complaint_id)
            .await?;
        let current = restaurant
            .complaint(request.complaint_id)
            .ok_or_else(|| ServiceError::not_found("Complaint", request.complaint_id))?;

        let updated = apply_transition(
            current,
            request.status,
            request.remark.as_deref(),
            request.actor,
            self.clock.now(),
        )?;

        restaurant.replace_complaint(updated.clone());
        let restaurant = self.save(restaurant).await?;
        Ok((restaurant, updated))
    }

    /// Load the aggregate owning `complaint_id`, optionally scoped to one restaurant.
    async fn locate(
        &self,
        scope: Option<RestaurantId>,
        complaint_id: ComplaintId,
    ) -> Result<Restaurant, ServiceError> {
        let restaurant = match scope {
            Some(restaurant_id) => Some(
                self.store
                    .load(restaurant_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Restaurant", restaurant_id))?,
            ),
            None => self.store.load_by_complaint(complaint_id).await?,
        };

        restaurant
            .filter(|r| r.complaint(complaint_id).is_some())
            .ok_or_else(|| ServiceError::not_found("Complaint", complaint_id))
    }

    async fn save(&self, restaurant: Restaurant) -> Result<Restaurant, ServiceError> {
        match self.store.save(restaurant.clone()).await {
            Ok(version) => Ok(restaurant.with_version(version)),
            Err(error @ StoreError::ConcurrencyConflict { .. }) => {
                LifecycleMetrics::record_conflict();
                Err(error.into())
            },
            Err(error) => Err(error.into()),
        }
    }

    /// A complaint with its restaurant's id and name.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if the complaint does not exist.
    pub async fn get_complaint(
        &self,
        complaint_id: ComplaintId,
    ) -> Result<ComplaintView, ServiceError> {
        let restaurant = self.locate(None, complaint_id).await?;
        let complaint = restaurant
            .complaint(complaint_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Complaint", complaint_id))?;

        Ok(ComplaintView {
            complaint,
            restaurant: restaurant.summary(),
        })
    }

    /// Every complaint of one restaurant, in filing order.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if the restaurant does not exist.
    pub async fn complaints_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<ComplaintRecord>, ServiceError> {
        let restaurant = self
            .store
            .load(restaurant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Restaurant", restaurant_id))?;
        Ok(restaurant.complaints().to_vec())
    }

    /// Complaints filed by `submitter` across all restaurants.
    ///
    /// # Errors
    ///
    /// Persistence errors only; no complaints is an empty list.
    pub async fn complaints_by_submitter(
        &self,
        submitter: UserId,
    ) -> Result<Vec<ComplaintSummary>, ServiceError> {
        let restaurants = self.store.list_by_submitter(submitter).await?;
        Ok(restaurants
            .iter()
            .flat_map(|r| {
                r.complaints()
                    .iter()
                    .filter(move |c| c.submitter() == submitter)
                    .map(move |c| ComplaintSummary::of(r, c))
            })
            .collect())
    }

    /// Complaints across all restaurants.
    ///
    /// # Errors
    ///
    /// Persistence errors.
    pub async fn all_complaints(&self) -> Result<Vec<ComplaintSummary>, ServiceError> {
        let restaurants = self.store.list().await?;
        Ok(restaurants
            .iter()
            .flat_map(|r| r.complaints().iter().map(move |c| ComplaintSummary::of(r, c)))
            .collect())
    }

    /// Notifications visible to the caller, newest first. Admins see everyone's.
    ///
    /// # Errors
    ///
    /// Persistence errors.
    pub async fn notifications_for(
        &self,
        caller: UserId,
        role: Role,
    ) -> Result<Vec<Notification>, ServiceError> {
        let notifications = match role {
            Role::Admin => self.inbox.list_all().await?,
            _ => self.inbox.list_for(caller).await?,
        };
        Ok(notifications)
    }

    /// Mark one of the caller's notifications as read.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if the notification does not exist or is
    /// addressed to someone else.
    pub async fn mark_notification_read(
        &self,
        id: NotificationId,
        caller: UserId,
    ) -> Result<Notification, ServiceError> {
        Ok(self.inbox.mark_read(id, caller).await?)
    }

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Persistence errors.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.store.ping().await?)
    }
}

impl std::fmt::Debug for ComplaintLifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplaintLifecycleService")
            .field("dispatcher", &self.dispatcher)
            .field("conflict_retry", &self.conflict_retry)
            .finish_non_exhaustive()
    }
}
