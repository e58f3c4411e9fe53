use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use quarter_core::models::{NewReservation, Reservation, ReservationStatus, ReservationUpdate};
use quarter_core::parse_id;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub status: ReservationStatus,
}

impl ReservationResponse {
    fn at_now(state: &AppState, reservation: Reservation) -> Self {
        let status = reservation.status(state.booking.now());
        Self { reservation, status }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", post(create_reservation))
        .route(
            "/reservations/{id}",
            get(get_reservation).patch(update_reservation),
        )
}

/// POST /reservations
/// Hold a slot until it is confirmed or the hold lapses.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<NewReservation>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let reservation = state.booking.create_reservation(req, state.deadline()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse::at_now(&state, reservation)),
    ))
}

/// GET /reservations/{id}
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation_id = parse_id("reservation_id", &id)?;
    let reservation = state
        .booking
        .get_reservation(reservation_id, state.deadline())
        .await?;
    Ok(Json(ReservationResponse::at_now(&state, reservation)))
}

/// PATCH /reservations/{id}
pub async fn update_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ReservationUpdate>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation_id = parse_id("reservation_id", &id)?;
    let reservation = state
        .booking
        .update_confirmation(reservation_id, update, state.deadline())
        .await?;
    Ok(Json(ReservationResponse::at_now(&state, reservation)))
}
