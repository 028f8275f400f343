//! Axum HTTP surface for Complaint Desk.
//!
//! The web layer is a thin shell around
//! [`ComplaintLifecycleService`](complaint_desk_runtime::ComplaintLifecycleService):
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          HTTP shell (this crate)        │  ← JSON, identity headers, roles
//! │  - Request parsing and role checks      │  ← correlation ids, tracing
//! │  - Error → status code mapping          │  ← WebSocket fan-out
//! ├─────────────────────────────────────────┤
//! │        Lifecycle service (runtime)      │
//! │  - Load / transition / save with retry  │
//! │  - Side effects after persistence       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. [`correlation_id_layer`] assigns the correlation id and opens the span
//! 2. [`Caller`] reads the identity forwarded by the gateway
//! 3. The handler checks the caller's role and calls the service
//! 4. [`AppError`] maps failures to `{"code", "message"}` bodies
//!
//! # Example
//!
//! ```ignore
//! use complaint_desk_web::{AppState, RealtimeHub, build_router};
//!
//! let hub = RealtimeHub::new(256);
//! let service = ComplaintLifecycleService::new(env_with(hub.clone()), LifecycleConfig::default());
//! let app = build_router(AppState::new(service, hub));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod realtime;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use extractors::{Caller, CorrelationId, USER_ID_HEADER, USER_ROLE_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use realtime::RealtimeHub;
pub use routes::build_router;
pub use state::AppState;
