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
use crate::middleware::{AdminUser, AppJson};
use crate::services::shows::{self, AddShowRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/now-playing", get(now_playing))
        .route("/add", post(add_show))
        .route("/all", get(all_shows))
        .route("/{movie_id}", get(show_by_movie))
}

// GET /api/show/now-playing
async fn now_playing(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let movies = shows::now_playing(&state).await?;
    Ok(Json(json!({ "success": true, "movies": movies })))
}

// POST /api/show/add
async fn add_show(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    AppJson(request): AppJson<AddShowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let movie_id = request.movie_id.clone();
    let count = shows::add_shows(&state, request).await?;
    tracing::info!("admin {} added {} shows for {}", admin.user_id, count, movie_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Show added successfully" })),
    ))
}

// GET /api/show/all
async fn all_shows(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let movies = shows::list_upcoming(&state).await?;
    Ok(Json(json!({ "success": true, "shows": movies })))
}

// GET /api/show/{movie_id}
async fn show_by_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (movie, date_time) = shows::shows_for_movie(&state, &movie_id).await?;
    Ok(Json(json!({ "success": true, "movie": movie, "dateTime": date_time })))
}
