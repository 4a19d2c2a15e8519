use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/bookings", get(user_bookings))
}

// GET /api/user/bookings
async fn user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let bookings = booking::user_bookings(&state, &user.user_id).await?;
    Ok(Json(json!({ "success": true, "bookings": bookings })))
}
