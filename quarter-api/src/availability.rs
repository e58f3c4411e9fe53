use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use quarter_core::models::{Availability, AvailabilityListing, AvailabilityQuery, NewAvailability};
use quarter_core::parse_id;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/availability", post(set_availability))
        .route("/availability/{provider_id}", get(get_availabilities))
}

/// POST /availability
pub async fn set_availability(
    State(state): State<AppState>,
    Json(req): Json<NewAvailability>,
) -> Result<(StatusCode, Json<Availability>), AppError> {
    let availability = state.booking.set_availability(req, state.deadline()).await?;
    Ok((StatusCode::CREATED, Json(availability)))
}

/// GET /availability/{provider_id}?start=..&end=..&expand=true
pub async fn get_availabilities(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityListing>, AppError> {
    let provider_id = parse_id("provider_id", &provider_id)?;
    let listing = state
        .booking
        .get_availabilities(provider_id, query, state.deadline())
        .await?;
    Ok(Json(listing))
}
