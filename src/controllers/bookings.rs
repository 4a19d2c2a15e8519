use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::{AppJson, AuthUser};
use crate::services::booking::{self, parse_id, CreateBookingRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(create_booking))
        .route("/seats/{show_id}", get(occupied_seats))
        .route("/{booking_id}/cancel", post(cancel_booking))
        .route("/{booking_id}/pay", post(pay_booking))
}

/* ---------- BOOKINGS ---------- */

// POST /api/booking/create
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(request): AppJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = booking::create_booking(&state, request, &user.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Booked successfully", "booking": booking })),
    ))
}

// POST /api/booking/{booking_id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking_id = parse_id(&booking_id, "bookingId")?;
    let booking = booking::cancel(&state, booking_id, &user.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled",
        "releasedSeats": booking.booked_seats
    })))
}

// POST /api/booking/{booking_id}/pay
async fn pay_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking_id = parse_id(&booking_id, "bookingId")?;
    let booking = booking::pay(&state, booking_id, &user.user_id).await?;
    Ok(Json(json!({ "success": true, "booking": booking })))
}

/* ---------- SEATS ---------- */

// GET /api/booking/seats/{show_id}
async fn occupied_seats(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let show_id = parse_id(&show_id, "showId")?;
    let seats = booking::occupied_seats(&state, show_id).await?;
    Ok(Json(json!({ "success": true, "occupiedSeats": seats })))
}
