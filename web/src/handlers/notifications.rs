//! Notification inbox endpoints.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use complaint_desk_core::notification::Notification;
use complaint_desk_core::types::NotificationId;
use serde::Serialize;
use uuid::Uuid;

/// Response of `GET /api/restaurants/notifications`.
#[derive(Debug, Serialize)]
pub struct NotificationList {
    /// Newest first
    pub notifications: Vec<Notification>,
}

/// `GET /api/restaurants/notifications`
///
/// Admins see every notification, everyone else only their own.
///
/// # Errors
///
/// 500 on store failure.
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<NotificationList>, AppError> {
    let notifications = state
        .service
        .notifications_for(caller.id, caller.role)
        .await?;
    Ok(Json(NotificationList { notifications }))
}

/// `PUT /api/restaurants/notifications/:id/read`
///
/// # Errors
///
/// 404 if the notification is unknown or addressed to someone else.
pub async fn mark_read(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification = state
        .service
        .mark_notification_read(NotificationId::from_uuid(id), caller.id)
        .await?;
    Ok(Json(notification))
}
