//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id, as assigned by
//!   [`correlation_id_layer`](crate::middleware::correlation_id_layer)
//! - [`Caller`]: the authenticated identity forwarded by the gateway

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use complaint_desk_core::types::{Role, UserId};
use uuid::Uuid;

/// Header carrying the caller's user id (UUID).
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the caller's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Correlation ID for request tracing.
///
/// Read from request extensions when the middleware is installed, otherwise
/// from the `X-Correlation-ID` header, otherwise a fresh UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Parse the header value, if present and a valid UUID.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(Self)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<Self>()
            .copied()
            .or_else(|| Self::from_headers(&parts.headers))
            .unwrap_or_else(|| Self(Uuid::new_v4()));
        Ok(id)
    }
}

/// The authenticated caller.
///
/// Authentication happens upstream; the gateway forwards the verified
/// identity in [`USER_ID_HEADER`] and [`USER_ROLE_HEADER`]. A missing or
/// malformed identity is rejected with 401.
///
/// # Example
///
/// ```ignore
/// async fn handler(caller: Caller) -> Result<Json<()>, AppError> {
///     caller.require(&[Role::FoodSafetyOfficer])?;
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// User id
    pub id: UserId,
    /// Role held for this request
    pub role: Role,
}

impl Caller {
    /// Fail with 403 unless the caller holds one of `allowed`.
    ///
    /// # Errors
    ///
    /// [`AppError`] with status 403 and `Access denied. Required role: <roles>.`
    pub fn require(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }

        let roles = allowed
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        tracing::debug!(user_id = %self.id, role = %self.role, required = %roles, "Role check failed");
        Err(AppError::forbidden(format!(
            "Access denied. Required role: {roles}."
        )))
    }

    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let id = header(USER_ID_HEADER).and_then(|s| Uuid::parse_str(s.trim()).ok())?;
        let role = header(USER_ROLE_HEADER).and_then(|s| s.parse::<Role>().ok())?;
        Some(Self {
            id: UserId::from_uuid(id),
            role,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Access denied. No identity provided."))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn caller_from(headers: &[(&str, &str)]) -> Result<Caller, AppError> {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, ()) = builder.body(()).expect("Valid request").into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let assigned = CorrelationId(Uuid::new_v4());
        let mut req = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");
        req.extensions_mut().insert(assigned);

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id, assigned);
    }

    #[tokio::test]
    async fn test_caller_from_gateway_headers() {
        let id = Uuid::new_v4();
        let id_header = id.to_string();
        let caller = caller_from(&[
            (USER_ID_HEADER, id_header.as_str()),
            (USER_ROLE_HEADER, "FoodSafetyOfficeUser"),
        ])
        .await
        .unwrap();

        assert_eq!(caller.id, UserId::from_uuid(id));
        assert_eq!(caller.role, Role::FoodSafetyOfficer);
    }

    #[tokio::test]
    async fn test_missing_or_bad_identity_is_unauthorized() {
        let id = Uuid::new_v4().to_string();
        for headers in [
            vec![],
            vec![(USER_ID_HEADER, id.as_str())],
            vec![(USER_ID_HEADER, "not-a-uuid"), (USER_ROLE_HEADER, "Admin")],
            vec![(USER_ID_HEADER, id.as_str()), (USER_ROLE_HEADER, "Chef")],
        ] {
            let err = caller_from(&headers).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_require_lists_allowed_roles() {
        let caller = Caller {
            id: UserId::new(),
            role: Role::Customer,
        };

        let err = caller
            .require(&[Role::Admin, Role::FoodSafetyOfficer])
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            err.message(),
            "Access denied. Required role: Admin or FoodSafetyOfficeUser."
        );

        assert!(caller.require(&[Role::Customer]).is_ok());
    }
}
