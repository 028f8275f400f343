//! Complaint endpoints.
//!
//! Filing, queries and the status workflow. Role checks happen here, before
//! the lifecycle service is invoked.

use crate::error::AppError;
use crate::extractors::{Caller, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use complaint_desk_core::complaint::{ComplaintRecord, ComplaintStatus};
use complaint_desk_core::types::{ComplaintId, RestaurantId, Role};
use complaint_desk_core::views::{ComplaintSummary, ComplaintView};
use complaint_desk_runtime::UpdateComplaintStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles allowed to move complaints through the workflow.
pub const STATUS_UPDATE_ROLES: &[Role] = &[Role::FoodSafetyOfficer];

/// Roles allowed to list every complaint.
pub const ALL_COMPLAINTS_ROLES: &[Role] = &[Role::Admin, Role::FoodSafetyOfficer];

/// Body of `POST /api/restaurants/:id/complaint`.
#[derive(Debug, Deserialize)]
pub struct FileComplaintRequest {
    /// Complaint text
    #[serde(default)]
    pub message: String,
}

/// Body of the status update endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    /// Requested status, e.g. `"Action Taken"`
    pub status: String,
    /// Remark for the activity log
    #[serde(default)]
    pub remark: Option<String>,
}

/// Envelope for single-complaint write responses.
#[derive(Debug, Serialize)]
pub struct ComplaintResponse {
    /// Human-readable outcome
    pub message: &'static str,
    /// The complaint after the write
    pub complaint: ComplaintRecord,
}

/// Envelope for complaint lists.
#[derive(Debug, Serialize)]
pub struct ComplaintList<T> {
    /// Matching complaints
    pub complaints: Vec<T>,
}

/// `POST /api/restaurants/:id/complaint`
///
/// # Errors
///
/// 400 for a blank message, 404 for an unknown restaurant.
pub async fn file_complaint(
    State(state): State<AppState>,
    caller: Caller,
    Path(restaurant_id): Path<Uuid>,
    Json(request): Json<FileComplaintRequest>,
) -> Result<(StatusCode, Json<ComplaintResponse>), AppError> {
    let complaint = state
        .service
        .file_complaint(
            RestaurantId::from_uuid(restaurant_id),
            caller.id,
            &request.message,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ComplaintResponse {
            message: "Complaint submitted successfully",
            complaint,
        }),
    ))
}

/// `GET /api/restaurants/:id/complaints`
///
/// # Errors
///
/// 404 for an unknown restaurant.
pub async fn complaints_for_restaurant(
    State(state): State<AppState>,
    _caller: Caller,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<ComplaintList<ComplaintRecord>>, AppError> {
    let complaints = state
        .service
        .complaints_for_restaurant(RestaurantId::from_uuid(restaurant_id))
        .await?;
    Ok(Json(ComplaintList { complaints }))
}

/// `GET /api/restaurants/my-complaints`
///
/// # Errors
///
/// 500 on store failure.
pub async fn my_complaints(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ComplaintList<ComplaintSummary>>, AppError> {
    let complaints = state.service.complaints_by_submitter(caller.id).await?;
    Ok(Json(ComplaintList { complaints }))
}

/// `GET /api/restaurants/all-complaints`
///
/// # Errors
///
/// 403 unless the caller is an admin or a food safety officer.
pub async fn all_complaints(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ComplaintList<ComplaintSummary>>, AppError> {
    caller.require(ALL_COMPLAINTS_ROLES)?;
    let complaints = state.service.all_complaints().await?;
    Ok(Json(ComplaintList { complaints }))
}

/// `GET /api/restaurants/complaint/:complaint_id`
///
/// # Errors
///
/// 404 for an unknown complaint.
pub async fn get_complaint(
    State(state): State<AppState>,
    _caller: Caller,
    Path(complaint_id): Path<Uuid>,
) -> Result<Json<ComplaintView>, AppError> {
    let view = state
        .service
        .get_complaint(ComplaintId::from_uuid(complaint_id))
        .await?;
    Ok(Json(view))
}

/// `PUT /api/restaurants/complaint/:complaint_id/status`
///
/// Locates the complaint through the complaint index.
///
/// # Errors
///
/// See [`apply_status_update`].
pub async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    correlation_id: CorrelationId,
    Path(complaint_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<ComplaintResponse>, AppError> {
    apply_status_update(
        &state,
        caller,
        correlation_id,
        None,
        ComplaintId::from_uuid(complaint_id),
        request,
    )
    .await
}

/// `PUT /api/restaurants/:id/complaints/:complaint_id/status`
///
/// Only finds the complaint if it belongs to the given restaurant.
///
/// # Errors
///
/// See [`apply_status_update`].
pub async fn update_status_scoped(
    State(state): State<AppState>,
    caller: Caller,
    correlation_id: CorrelationId,
    Path((restaurant_id, complaint_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<ComplaintResponse>, AppError> {
    apply_status_update(
        &state,
        caller,
        correlation_id,
        Some(RestaurantId::from_uuid(restaurant_id)),
        ComplaintId::from_uuid(complaint_id),
        request,
    )
    .await
}

/// Shared body of both status update endpoints.
///
/// # Errors
///
/// - 403 unless the caller is a food safety officer
/// - 400 for an unknown status, a backward move or a missing remark
/// - 404 if the complaint does not exist (in the given restaurant)
/// - 409 if concurrent writers exhausted the retries
async fn apply_status_update(
    state: &AppState,
    caller: Caller,
    correlation_id: CorrelationId,
    restaurant_id: Option<RestaurantId>,
    complaint_id: ComplaintId,
    request: StatusUpdateRequest,
) -> Result<Json<ComplaintResponse>, AppError> {
    caller.require(STATUS_UPDATE_ROLES)?;

    let status = request
        .status
        .parse::<ComplaintStatus>()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    tracing::debug!(
        correlation_id = %correlation_id.0,
        complaint_id = %complaint_id,
        status = %status,
        "Status update requested"
    );

    let complaint = state
        .service
        .update_complaint_status(UpdateComplaintStatus {
            restaurant_id,
            complaint_id,
            status,
            remark: request.remark,
            actor: caller.id,
        })
        .await?;

    Ok(Json(ComplaintResponse {
        message: "Complaint status updated successfully",
        complaint,
    }))
}
