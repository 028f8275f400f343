//! Restaurant registration.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use complaint_desk_core::restaurant::Restaurant;
use complaint_desk_core::types::Role;
use serde::{Deserialize, Serialize};

/// Roles allowed to register restaurants.
pub const REGISTER_ROLES: &[Role] = &[Role::RestaurantOwner, Role::Admin];

/// Body of `POST /api/restaurants`.
#[derive(Debug, Deserialize)]
pub struct RegisterRestaurantRequest {
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// Response of `POST /api/restaurants`.
#[derive(Debug, Serialize)]
pub struct RegisterRestaurantResponse {
    /// Human-readable outcome
    pub message: &'static str,
    /// The new aggregate, owned by the caller
    pub restaurant: Restaurant,
}

/// `POST /api/restaurants`
///
/// # Errors
///
/// 403 unless the caller is an owner or admin, 400 for a blank name.
pub async fn register_restaurant(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<RegisterRestaurantRequest>,
) -> Result<(StatusCode, Json<RegisterRestaurantResponse>), AppError> {
    caller.require(REGISTER_ROLES)?;

    let restaurant = state
        .service
        .register_restaurant(&request.name, caller.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterRestaurantResponse {
            message: "Restaurant registered successfully",
            restaurant,
        }),
    ))
}
