//! Application state for Axum handlers.

use crate::realtime::RealtimeHub;
use complaint_desk_runtime::ComplaintLifecycleService;

/// State shared across all HTTP handlers.
///
/// The hub must be the same instance the service publishes to, so that
/// WebSocket subscribers see the service's events.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Complaint lifecycle operations
    pub service: ComplaintLifecycleService,
    /// Realtime fan-out for WebSocket connections
    pub hub: RealtimeHub,
}

impl AppState {
    /// Bundle the service with its realtime hub.
    #[must_use]
    pub const fn new(service: ComplaintLifecycleService, hub: RealtimeHub) -> Self {
        Self { service, hub }
    }
}
