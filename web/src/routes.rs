//! Route table.

use crate::handlers::{complaints, health, notifications, restaurants, websocket};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router.
///
/// ```text
/// POST /api/restaurants                                   register
/// POST /api/restaurants/:id/complaint                     file a complaint
/// GET  /api/restaurants/:id/complaints                    complaints of one restaurant
/// PUT  /api/restaurants/:id/complaints/:complaint_id/status
/// GET  /api/restaurants/my-complaints
/// GET  /api/restaurants/all-complaints
/// GET  /api/restaurants/complaint/:complaint_id
/// PUT  /api/restaurants/complaint/:complaint_id/status
/// GET  /api/restaurants/notifications
/// PUT  /api/restaurants/notifications/:id/read
/// GET  /health, /ready, /ws
/// ```
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", post(restaurants::register_restaurant))
        .route("/my-complaints", get(complaints::my_complaints))
        .route("/all-complaints", get(complaints::all_complaints))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/:id/read", put(notifications::mark_read))
        .route("/complaint/:complaint_id", get(complaints::get_complaint))
        .route(
            "/complaint/:complaint_id/status",
            put(complaints::update_status),
        )
        .route("/:id/complaint", post(complaints::file_complaint))
        .route("/:id/complaints", get(complaints::complaints_for_restaurant))
        .route(
            "/:id/complaints/:complaint_id/status",
            put(complaints::update_status_scoped),
        );

    Router::new()
        .nest("/api/restaurants", api)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/ws", get(websocket::handle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
