//! Error type for web handlers.
//!
//! Bridges [`ServiceError`] and request validation failures to JSON error
//! responses of the form `{"code": "...", "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use complaint_desk_core::transition::TransitionError;
use complaint_desk_runtime::ServiceError;
use serde::Serialize;
use std::fmt;

/// Message returned for every server error.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Application error type for web handlers.
///
/// Implements Axum's `IntoResponse`. Server errors keep their cause in
/// `source` for logging; it is never serialized.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<ComplaintView>, AppError> {
///     let view = state.service.get_complaint(id).await?;
///     Ok(Json(view))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// 500 Internal Server Error with the generic message.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            INTERNAL_ERROR_MESSAGE,
        )
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { resource, id } => Self::not_found(resource, id),
            ServiceError::InvalidInput(message) => Self::bad_request(message),
            ServiceError::Transition(TransitionError::BackwardTransition { .. }) => Self::new(
                StatusCode::BAD_REQUEST,
                "BACKWARD_TRANSITION",
                "Cannot move status backward.",
            ),
            ServiceError::Transition(TransitionError::RemarkRequired { .. }) => Self::new(
                StatusCode::BAD_REQUEST,
                "REMARK_REQUIRED",
                "Remark is required for this status update.",
            ),
            ServiceError::ConcurrencyConflict { .. } => {
                Self::conflict("The complaint was modified concurrently, please retry.")
                    .with_source(anyhow::Error::new(err))
            },
            ServiceError::Persistence(_) => Self::internal().with_source(anyhow::Error::new(err)),
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(status = %self.status, code = %self.code, "Internal server error"),
            }
        } else if let Some(source) = &self.source {
            tracing::debug!(status = %self.status, code = %self.code, error = %source, "Request rejected");
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use complaint_desk_core::complaint::ComplaintStatus;
    use complaint_desk_core::types::{ComplaintId, RestaurantId};

    #[test]
    fn not_found_message_names_the_resource() {
        let id = ComplaintId::new();
        let err = AppError::from(ServiceError::not_found("Complaint", id));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), format!("Complaint with id {id} not found"));
    }

    #[test]
    fn transition_errors_have_distinct_messages() {
        let backward = AppError::from(ServiceError::Transition(
            TransitionError::BackwardTransition {
                from: ComplaintStatus::ActionTaken,
                to: ComplaintStatus::Submitted,
            },
        ));
        assert_eq!(backward.status(), StatusCode::BAD_REQUEST);
        assert_eq!(backward.message(), "Cannot move status backward.");

        let remark = AppError::from(ServiceError::Transition(TransitionError::RemarkRequired {
            status: ComplaintStatus::Resolved,
        }));
        assert_eq!(remark.status(), StatusCode::BAD_REQUEST);
        assert_eq!(remark.code(), "REMARK_REQUIRED");
        assert_eq!(remark.message(), "Remark is required for this status update.");
    }

    #[test]
    fn infrastructure_errors_do_not_leak_detail() {
        let err = AppError::from(ServiceError::Persistence(
            "connection refused at 10.0.0.3:5432".to_string(),
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), INTERNAL_ERROR_MESSAGE);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn exhausted_conflicts_are_409() {
        let err = AppError::from(ServiceError::ConcurrencyConflict {
            restaurant_id: RestaurantId::new(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), format!("[CONFLICT] {}", err.message()));
    }
}
