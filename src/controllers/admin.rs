//! Админские маршруты: сводка, все сеансы, все бронирования.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::services::{booking, shows};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/is-admin", get(is_admin))
        .route("/dashboard", get(dashboard))
        .route("/all-shows", get(all_shows))
        .route("/all-bookings", get(all_bookings))
}

// GET /api/admin/is-admin
async fn is_admin(_admin: AdminUser) -> impl IntoResponse {
    Json(json!({ "success": true, "isAdmin": true }))
}

// GET /api/admin/dashboard
async fn dashboard(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let data = booking::dashboard(&state).await?;
    Ok(Json(json!({ "success": true, "dashboardData": data })))
}

// GET /api/admin/all-shows
async fn all_shows(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let shows = shows::admin_shows(&state).await?;
    Ok(Json(json!({ "success": true, "shows": shows })))
}

// GET /api/admin/all-bookings
async fn all_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let bookings = booking::all_bookings(&state).await?;
    Ok(Json(json!({ "success": true, "bookings": bookings })))
}
