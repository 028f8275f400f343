//! End-to-end tests for the complaint lifecycle service against in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use complaint_desk_core::prelude::*;
use complaint_desk_runtime::{
    ComplaintLifecycleService, LifecycleConfig, LifecycleEnvironment, RetryPolicy, ServiceError,
    UpdateComplaintStatus,
};
use complaint_desk_testing::fixtures;
use complaint_desk_testing::{
    InMemoryAggregateStore, InMemoryNotifications, RecordingBroadcaster, test_clock,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    service: ComplaintLifecycleService,
    store: InMemoryAggregateStore,
    notifications: InMemoryNotifications,
    broadcaster: RecordingBroadcaster,
}

fn harness_with(config: LifecycleConfig) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let store = InMemoryAggregateStore::new();
    let notifications = InMemoryNotifications::new();
    let broadcaster = RecordingBroadcaster::new();

    let service = ComplaintLifecycleService::new(
        LifecycleEnvironment {
            store: Arc::new(store.clone()),
            notifier: Arc::new(notifications.clone()),
            inbox: Arc::new(notifications.clone()),
            broadcaster: Arc::new(broadcaster.clone()),
            clock: Arc::new(test_clock()),
        },
        config,
    );

    Harness {
        service,
        store,
        notifications,
        broadcaster,
    }
}

fn fast_config() -> LifecycleConfig {
    LifecycleConfig {
        conflict_retry: RetryPolicy::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(1))
            .jitter(false)
            .build(),
        side_effect_timeout: Duration::from_millis(200),
    }
}

fn harness() -> Harness {
    harness_with(fast_config())
}

impl Harness {
    async fn seed(&self, status: ComplaintStatus) -> (Restaurant, ComplaintRecord) {
        let (restaurant, complaint) = fixtures::restaurant_with_complaint_at(status);
        self.store.insert(restaurant.clone()).await.unwrap();
        (restaurant, complaint)
    }

    async fn update(
        &self,
        complaint: &ComplaintRecord,
        status: ComplaintStatus,
        remark: &str,
    ) -> Result<ComplaintRecord, ServiceError> {
        self.service
            .update_complaint_status(UpdateComplaintStatus {
                restaurant_id: None,
                complaint_id: complaint.id(),
                status,
                remark: Some(remark.to_string()),
                actor: UserId::new(),
            })
            .await
    }

    async fn settle(&self) {
        self.service
            .dispatcher()
            .drain(Duration::from_secs(2))
            .await
            .unwrap();
    }

    fn persisted(&self, restaurant: &Restaurant, complaint: &ComplaintRecord) -> ComplaintRecord {
        self.store
            .snapshot(restaurant.id())
            .unwrap()
            .complaint(complaint.id())
            .cloned()
            .unwrap()
    }
}

// ============================================================================
// Status workflow scenarios
// ============================================================================

#[tokio::test]
async fn acknowledging_without_remark_succeeds() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Submitted).await;
    assert_eq!(complaint.activity_log().len(), 1);

    let updated = assert_ok!(h.update(&complaint, ComplaintStatus::Acknowledged, "").await);

    assert_eq!(updated.status(), ComplaintStatus::Acknowledged);
    assert_eq!(updated.activity_log().len(), 2);
    assert_eq!(h.persisted(&restaurant, &complaint).activity_log().len(), 2);
}

#[tokio::test]
async fn action_taken_without_remark_leaves_record_unchanged() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Acknowledged).await;

    let error = assert_err!(h.update(&complaint, ComplaintStatus::ActionTaken, "  ").await);
    assert!(matches!(
        error,
        ServiceError::Transition(TransitionError::RemarkRequired {
            status: ComplaintStatus::ActionTaken
        })
    ));

    let persisted = h.persisted(&restaurant, &complaint);
    assert_eq!(persisted.status(), ComplaintStatus::Acknowledged);
    assert_eq!(persisted.activity_log().len(), 2);
    assert_eq!(h.store.save_count(), 0);

    h.settle().await;
    assert!(h.notifications.sent().is_empty());
    assert!(h.broadcaster.events().is_empty());
}

#[tokio::test]
async fn action_taken_with_remark_succeeds() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Acknowledged).await;

    let updated = h
        .update(&complaint, ComplaintStatus::ActionTaken, "Kitchen inspected")
        .await
        .unwrap();

    assert_eq!(updated.status(), ComplaintStatus::ActionTaken);
    assert_eq!(updated.remark(), "Kitchen inspected");
    assert_eq!(updated.activity_log().len(), 3);
    assert_eq!(h.persisted(&restaurant, &complaint).status(), ComplaintStatus::ActionTaken);
}

#[tokio::test]
async fn backward_transition_is_rejected() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::ActionTaken).await;

    let error = h
        .update(&complaint, ComplaintStatus::Submitted, "")
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        ServiceError::Transition(TransitionError::BackwardTransition { .. })
    ));

    let persisted = h.persisted(&restaurant, &complaint);
    assert_eq!(persisted.status(), ComplaintStatus::ActionTaken);
    assert_eq!(persisted.activity_log().len(), complaint.activity_log().len());
}

#[tokio::test]
async fn resolving_notifies_owner_once_and_broadcasts() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::ActionTaken).await;

    let updated = h
        .update(&complaint, ComplaintStatus::Resolved, "Issue fixed")
        .await
        .unwrap();
    assert_eq!(updated.status(), ComplaintStatus::Resolved);
    h.settle().await;

    let sent = h.notifications.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, restaurant.owner());
    assert_eq!(sent[0].kind, NotificationKind::Complaint);
    assert_eq!(sent[0].reference_id, Some(*complaint.id().as_uuid()));
    assert_eq!(
        sent[0].message,
        format!("Complaint {} at Blue Door is now Resolved", complaint.id())
    );

    assert_eq!(
        h.broadcaster.events(),
        vec![RealtimeEvent::ComplaintUpdated {
            complaint_id: complaint.id(),
            new_status: ComplaintStatus::Resolved,
        }]
    );
}

#[tokio::test]
async fn same_status_update_appends_entry() {
    let h = harness();
    let (_, complaint) = h.seed(ComplaintStatus::Acknowledged).await;

    let first = h
        .update(&complaint, ComplaintStatus::Acknowledged, "Looking into it")
        .await
        .unwrap();
    let second = h
        .update(&complaint, ComplaintStatus::Acknowledged, "Looking into it")
        .await
        .unwrap();

    assert_eq!(first.activity_log().len(), 3);
    assert_eq!(second.activity_log().len(), 4);
    assert_eq!(second.status(), ComplaintStatus::Acknowledged);
}

#[tokio::test]
async fn every_successful_transition_notifies_exactly_once() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Submitted).await;

    let requests = [
        (ComplaintStatus::Acknowledged, ""),
        (ComplaintStatus::ActionTaken, ""),
        (ComplaintStatus::ActionTaken, "Supplier changed"),
        (ComplaintStatus::Acknowledged, "too late"),
        (ComplaintStatus::ActionTaken, "Staff retrained"),
        (ComplaintStatus::Resolved, "Closed after inspection"),
    ];

    let mut successes = 0;
    for (status, remark) in requests {
        if h.update(&complaint, status, remark).await.is_ok() {
            successes += 1;
        }
    }
    h.settle().await;

    assert_eq!(successes, 4);
    assert_eq!(h.notifications.sent_to(restaurant.owner()).len(), successes);
    assert_eq!(h.notifications.sent().len(), successes);
    assert_eq!(h.broadcaster.events().len(), successes);
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn scoped_lookup_requires_matching_restaurant() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Submitted).await;
    let (other, _) = h.seed(ComplaintStatus::Submitted).await;

    let request = |restaurant_id| UpdateComplaintStatus {
        restaurant_id: Some(restaurant_id),
        complaint_id: complaint.id(),
        status: ComplaintStatus::Acknowledged,
        remark: None,
        actor: UserId::new(),
    };

    let error = h
        .service
        .update_complaint_status(request(other.id()))
        .await
        .unwrap_err();
    assert!(matches!(error, ServiceError::NotFound { resource: "Complaint", .. }));

    let error = h
        .service
        .update_complaint_status(request(RestaurantId::new()))
        .await
        .unwrap_err();
    assert!(matches!(error, ServiceError::NotFound { resource: "Restaurant", .. }));

    assert_ok!(h.service.update_complaint_status(request(restaurant.id())).await);
}

#[tokio::test]
async fn unknown_complaint_is_not_found() {
    let h = harness();
    h.seed(ComplaintStatus::Submitted).await;

    let error = h
        .service
        .update_complaint_status(UpdateComplaintStatus {
            restaurant_id: None,
            complaint_id: ComplaintId::new(),
            status: ComplaintStatus::Acknowledged,
            remark: None,
            actor: UserId::new(),
        })
        .await
        .unwrap_err();

    assert!(error.to_string().starts_with("Complaint with id"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn conflicting_save_is_retried_against_fresh_state() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Acknowledged).await;
    h.store.inject_conflicts(1);

    let updated = h
        .update(&complaint, ComplaintStatus::ActionTaken, "Kitchen inspected")
        .await
        .unwrap();

    assert_eq!(updated.activity_log().len(), 3);
    assert_eq!(h.store.save_count(), 1);
    assert_eq!(h.store.version_of(restaurant.id()), Some(Version::new(2)));
}

#[tokio::test]
async fn exhausted_retries_surface_conflict_without_side_effects() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Acknowledged).await;
    h.store.inject_conflicts(10);

    let error = h
        .update(&complaint, ComplaintStatus::ActionTaken, "Kitchen inspected")
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ServiceError::ConcurrencyConflict { restaurant_id } if restaurant_id == restaurant.id()
    ));
    assert_eq!(h.store.save_count(), 0);

    h.settle().await;
    assert!(h.notifications.sent().is_empty());
}

#[tokio::test]
async fn concurrent_updates_never_overwrite_each_other() {
    let h = harness();
    h.store.yield_after_load(true);
    let (restaurant, complaint) = h.seed(ComplaintStatus::Acknowledged).await;

    let (first, second) = tokio::join!(
        h.update(&complaint, ComplaintStatus::ActionTaken, "Kitchen inspected"),
        h.update(&complaint, ComplaintStatus::ActionTaken, "Supplier audited"),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());

    // Both loaded version 0; the loser was rejected once and re-applied.
    assert_eq!(h.store.conflict_count(), 1);
    assert_eq!(h.store.save_count(), 2);

    let persisted = h.persisted(&restaurant, &complaint);
    assert_eq!(persisted.activity_log().len(), complaint.activity_log().len() + 2);
    let remarks: Vec<_> = persisted
        .activity_log()
        .iter()
        .skip(complaint.activity_log().len())
        .map(|e| e.remark.as_str())
        .collect();
    assert!(remarks.contains(&"Kitchen inspected"));
    assert!(remarks.contains(&"Supplier audited"));
}

#[tokio::test]
async fn concurrent_update_without_retry_surfaces_conflict() {
    let h = harness_with(LifecycleConfig {
        conflict_retry: RetryPolicy::none(),
        ..fast_config()
    });
    h.store.yield_after_load(true);
    let (restaurant, complaint) = h.seed(ComplaintStatus::Acknowledged).await;

    let (first, second) = tokio::join!(
        h.update(&complaint, ComplaintStatus::ActionTaken, "Kitchen inspected"),
        h.update(&complaint, ComplaintStatus::Resolved, "Refund issued"),
    );

    let outcomes = [&first, &second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::ConcurrencyConflict { .. })))
            .count(),
        1
    );

    let persisted = h.persisted(&restaurant, &complaint);
    assert_eq!(persisted.activity_log().len(), complaint.activity_log().len() + 1);
    assert_eq!(h.store.save_count(), 1);
}

#[tokio::test]
async fn stale_writer_sees_conflict_from_store() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::Acknowledged).await;

    let stale = h.store.load(restaurant.id()).await.unwrap().unwrap();
    h.update(&complaint, ComplaintStatus::ActionTaken, "Kitchen inspected")
        .await
        .unwrap();

    let mut stale = stale;
    let overwrite = apply_transition(
        stale.complaint(complaint.id()).unwrap(),
        ComplaintStatus::Resolved,
        Some("Overwrite"),
        UserId::new(),
        chrono::Utc::now(),
    )
    .unwrap();
    stale.replace_complaint(overwrite);

    assert!(matches!(
        h.store.save(stale).await,
        Err(StoreError::ConcurrencyConflict { .. })
    ));
    assert_eq!(h.persisted(&restaurant, &complaint).status(), ComplaintStatus::ActionTaken);
}

// ============================================================================
// Best-effort collaborators
// ============================================================================

#[tokio::test]
async fn collaborator_failures_do_not_fail_the_update() {
    let h = harness();
    let (restaurant, complaint) = h.seed(ComplaintStatus::ActionTaken).await;
    h.notifications.fail_with("smtp down");
    h.broadcaster.fail_with("no transport");

    let updated = h
        .update(&complaint, ComplaintStatus::Resolved, "Issue fixed")
        .await
        .unwrap();
    h.settle().await;

    assert_eq!(updated.status(), ComplaintStatus::Resolved);
    assert_eq!(h.persisted(&restaurant, &complaint).status(), ComplaintStatus::Resolved);
    assert!(h.notifications.sent().is_empty());
}

#[tokio::test]
async fn slow_collaborators_are_abandoned_after_timeout() {
    let h = harness_with(LifecycleConfig {
        side_effect_timeout: Duration::from_millis(50),
        ..fast_config()
    });
    let (_, complaint) = h.seed(ComplaintStatus::ActionTaken).await;
    h.notifications.stall_for(Duration::from_secs(30));
    h.broadcaster.stall_for(Duration::from_secs(30));

    let start = Instant::now();
    h.update(&complaint, ComplaintStatus::Resolved, "Issue fixed")
        .await
        .unwrap();
    h.settle().await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(h.service.dispatcher().pending(), 0);
    assert!(h.broadcaster.events().is_empty());
}

#[tokio::test]
async fn store_outage_is_a_persistence_error() {
    let h = harness();
    let (_, complaint) = h.seed(ComplaintStatus::Submitted).await;
    h.store.set_unavailable(true);

    let error = h
        .update(&complaint, ComplaintStatus::Acknowledged, "")
        .await
        .unwrap_err();
    assert!(matches!(error, ServiceError::Persistence(_)));
}

// ============================================================================
// Filing and queries
// ============================================================================

#[tokio::test]
async fn filing_seeds_log_and_notifies_owner() {
    let h = harness();
    let owner = UserId::new();
    let customer = UserId::new();
    let restaurant = h.service.register_restaurant("  Blue Door ", owner).await.unwrap();
    assert_eq!(restaurant.name(), "Blue Door");

    let complaint = h
        .service
        .file_complaint(restaurant.id(), customer, "Cold fries")
        .await
        .unwrap();
    h.settle().await;

    assert_eq!(complaint.status(), ComplaintStatus::Submitted);
    let seed = &complaint.activity_log()[0];
    assert_eq!(seed.actor, customer);
    assert_eq!(seed.remark, "Complaint submitted.");
    assert_eq!(seed.timestamp, test_clock().now());

    let sent = h.notifications.sent_to(owner);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "New complaint submitted for Blue Door");
    assert_eq!(sent[0].reference_id, Some(*restaurant.id().as_uuid()));

    assert!(matches!(
        h.broadcaster.events().as_slice(),
        [RealtimeEvent::ComplaintFiled { complaint_id, .. }] if *complaint_id == complaint.id()
    ));

    let view = h.service.get_complaint(complaint.id()).await.unwrap();
    assert_eq!(view.restaurant.name, "Blue Door");
    assert_eq!(view.complaint.id(), complaint.id());
}

#[tokio::test]
async fn filing_validates_message_and_restaurant() {
    let h = harness();

    let error = h
        .service
        .file_complaint(RestaurantId::new(), UserId::new(), "   ")
        .await
        .unwrap_err();
    assert!(matches!(error, ServiceError::InvalidInput(ref m) if m == "Complaint message is required"));

    let error = h
        .service
        .file_complaint(RestaurantId::new(), UserId::new(), "Loud music")
        .await
        .unwrap_err();
    assert!(matches!(error, ServiceError::NotFound { resource: "Restaurant", .. }));

    let error = h.service.register_restaurant(" ", UserId::new()).await.unwrap_err();
    assert!(matches!(error, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn queries_cover_restaurant_submitter_and_everything() {
    let h = harness();
    let alice = UserId::new();
    let bob = UserId::new();
    let first = h.service.register_restaurant("Blue Door", UserId::new()).await.unwrap();
    let second = h.service.register_restaurant("Red Lantern", UserId::new()).await.unwrap();

    h.service.file_complaint(first.id(), alice, "Cold soup").await.unwrap();
    h.service.file_complaint(second.id(), alice, "Slow service").await.unwrap();
    h.service.file_complaint(second.id(), bob, "Wrong order").await.unwrap();

    let for_second = h.service.complaints_for_restaurant(second.id()).await.unwrap();
    assert_eq!(for_second.len(), 2);
    assert_eq!(for_second[0].message(), "Slow service");

    let by_alice = h.service.complaints_by_submitter(alice).await.unwrap();
    assert_eq!(by_alice.len(), 2);
    assert!(by_alice.iter().all(|c| c.submitter == alice));

    assert!(h.service.complaints_by_submitter(UserId::new()).await.unwrap().is_empty());
    assert_eq!(h.service.all_complaints().await.unwrap().len(), 3);

    assert!(matches!(
        h.service.complaints_for_restaurant(RestaurantId::new()).await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn notifications_are_scoped_to_recipient_unless_admin() {
    let h = harness();
    let owner = UserId::new();
    let restaurant = h.service.register_restaurant("Blue Door", owner).await.unwrap();
    h.service
        .file_complaint(restaurant.id(), UserId::new(), "Cold soup")
        .await
        .unwrap();
    h.settle().await;

    let own = h.service.notifications_for(owner, Role::RestaurantOwner).await.unwrap();
    assert_eq!(own.len(), 1);

    let stranger = UserId::new();
    assert!(h.service.notifications_for(stranger, Role::Customer).await.unwrap().is_empty());
    assert_eq!(h.service.notifications_for(stranger, Role::Admin).await.unwrap().len(), 1);

    let error = h
        .service
        .mark_notification_read(own[0].id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(error, ServiceError::NotFound { resource: "Notification", .. }));

    let read = h.service.mark_notification_read(own[0].id, owner).await.unwrap();
    assert!(read.is_read);
}

/// Answers `load` with a fixed aggregate, whatever id was asked for.
struct MisroutingStore {
    inner: InMemoryAggregateStore,
    answer: RestaurantId,
}

impl AggregateStore for MisroutingStore {
    fn insert(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>> {
        self.inner.insert(restaurant)
    }

    fn load(
        &self,
        _restaurant_id: RestaurantId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>> {
        self.inner.load(self.answer)
    }

    fn load_by_complaint(
        &self,
        complaint_id: ComplaintId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>> {
        self.inner.load_by_complaint(complaint_id)
    }

    fn save(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>> {
        self.inner.save(restaurant)
    }

    fn list(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>> {
        self.inner.list()
    }

    fn list_by_submitter(
        &self,
        submitter: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>> {
        self.inner.list_by_submitter(submitter)
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        self.inner.ping()
    }
}

#[tokio::test]
async fn complaint_refused_by_loaded_aggregate_is_not_reported_as_filed() {
    let inner = InMemoryAggregateStore::new();
    let target = fixtures::restaurant("Blue Door");
    let other = fixtures::restaurant("Red Lantern");
    inner.insert(target.clone()).await.unwrap();
    inner.insert(other.clone()).await.unwrap();

    let notifications = InMemoryNotifications::new();
    let broadcaster = RecordingBroadcaster::new();
    let service = ComplaintLifecycleService::new(
        LifecycleEnvironment {
            store: Arc::new(MisroutingStore {
                inner: inner.clone(),
                answer: other.id(),
            }),
            notifier: Arc::new(notifications.clone()),
            inbox: Arc::new(notifications.clone()),
            broadcaster: Arc::new(broadcaster.clone()),
            clock: Arc::new(test_clock()),
        },
        fast_config(),
    );

    let result = service
        .file_complaint(target.id(), UserId::new(), "Cold soup")
        .await;
    assert!(matches!(result, Err(ServiceError::Persistence(_))));

    service.dispatcher().drain(Duration::from_secs(1)).await.unwrap();
    assert_eq!(inner.save_count(), 0);
    assert!(inner.snapshot(other.id()).unwrap().complaints().is_empty());
    assert!(notifications.sent().is_empty());
    assert!(broadcaster.events().is_empty());
}
