//! # Complaint Desk Runtime
//!
//! The imperative shell around `complaint-desk-core`.
//!
//! ## Core Components
//!
//! - **Lifecycle service**: load → apply domain logic → save with optimistic
//!   concurrency → dispatch side effects
//! - **Retry**: bounded exponential backoff for concurrency conflicts
//! - **Effect dispatcher**: fire-and-forget notification and broadcast tasks
//!   with timeouts and a drainable pending counter
//! - **Metrics**: Prometheus counters and histograms
//!
//! ## Example
//!
//! ```ignore
//! use complaint_desk_runtime::lifecycle::{ComplaintLifecycleService, LifecycleConfig, UpdateComplaintStatus};
//!
//! let service = ComplaintLifecycleService::new(environment, LifecycleConfig::default());
//! let updated = service
//!     .update_complaint_status(UpdateComplaintStatus {
//!         restaurant_id: None,
//!         complaint_id,
//!         status: ComplaintStatus::ActionTaken,
//!         remark: Some("Kitchen inspected".into()),
//!         actor: official,
//!     })
//!     .await?;
//! ```

/// Fire-and-forget side-effect execution
pub mod effects;

/// Errors surfaced by the lifecycle service
pub mod error;

/// Complaint lifecycle orchestration
pub mod lifecycle;

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

pub use effects::{DispatchError, EffectDispatcher};
pub use error::ServiceError;
pub use lifecycle::{
    ComplaintLifecycleService, LifecycleConfig, LifecycleEnvironment, UpdateComplaintStatus,
};
pub use retry::RetryPolicy;
